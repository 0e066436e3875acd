#![allow(dead_code)]

use anyhow::Context as _;
use std::process::{Command, Stdio};
use std::time::Duration;

#[allow(unused_imports)]
pub use ghl_test_support::{KillOnDrop, MockUpstream, pick_unused_port, wait_http_ok};

pub const BIN: &str = env!("CARGO_BIN_EXE_ghl-mcp-gateway");

/// Environment the gateway reads; cleared so the host environment cannot leak into a test.
const GATEWAY_ENV: &[&str] = &[
    "PORT",
    "GHL_PRIVATE_TOKEN",
    "GHL_DEFAULT_LOCATION",
    "GHL_BASE_URL",
    "GHL_API_VERSION",
    "GHL_GATEWAY_MODE",
    "GHL_GATEWAY_BIND",
    "GHL_GATEWAY_CONFIG",
    "GHL_BURST_LIMIT",
    "GHL_BURST_WINDOW_SECS",
    "GHL_DAILY_LIMIT",
    "GHL_GATEWAY_LOG_LEVEL",
    "GHL_GATEWAY_LOG_FORMAT",
];

/// A gateway command with a clean environment and quiet logs.
pub fn gateway_command() -> Command {
    let mut cmd = Command::new(BIN);
    for key in GATEWAY_ENV {
        cmd.env_remove(key);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

pub struct HttpGateway {
    pub base_url: String,
    _process: KillOnDrop,
}

/// Spawn the gateway in HTTP mode against `upstream` and wait for `/health`.
pub async fn spawn_http_gateway(upstream: &str, extra_args: &[&str]) -> anyhow::Result<HttpGateway> {
    let port = pick_unused_port()?;
    let child = gateway_command()
        .args(["--mode", "http", "--bind", "127.0.0.1"])
        .arg("--port")
        .arg(port.to_string())
        .arg("--base-url")
        .arg(upstream)
        .args(extra_args)
        .stdout(Stdio::null())
        .spawn()
        .context("spawn gateway")?;
    let process = KillOnDrop(child);

    let base_url = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(20)).await?;
    Ok(HttpGateway {
        base_url,
        _process: process,
    })
}
