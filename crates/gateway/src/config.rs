//! Command line, environment and YAML configuration.
//!
//! Precedence: CLI flag, then environment variable, then config file, then built-in default.

use crate::limiter::{
    DEFAULT_BURST_LIMIT, DEFAULT_BURST_WINDOW, DEFAULT_DAILY_LIMIT, LimiterConfig, MAX_BURST_WINDOW,
};
use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use ghl_crm_client::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// MCP over stdin/stdout.
    Stdio,
    /// MCP streamable HTTP plus the REST API on one listener.
    Http,
}

impl Mode {
    /// An explicit mode wins; otherwise a configured port implies HTTP.
    #[must_use]
    pub fn resolve(explicit: Option<Self>, port: Option<u16>) -> Self {
        match (explicit, port) {
            (Some(mode), _) => mode,
            (None, Some(_)) => Self::Http,
            (None, None) => Self::Stdio,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CRM tool gateway: MCP (stdio or streamable HTTP) and REST in front of the CRM API.
#[derive(Debug, Clone, Parser)]
#[command(name = "ghl-mcp-gateway", version)]
pub struct Cli {
    /// Transport mode. Defaults to `http` when a port is configured, `stdio` otherwise.
    #[arg(long, env = "GHL_GATEWAY_MODE", value_enum)]
    pub mode: Option<Mode>,

    #[arg(long, env = "GHL_GATEWAY_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// HTTP port (default 3000).
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Default access token used when a call carries none.
    #[arg(long, env = "GHL_PRIVATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Location used by REST endpoints when the request names none.
    #[arg(long, env = "GHL_DEFAULT_LOCATION")]
    pub default_location: Option<String>,

    #[arg(long, env = "GHL_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "GHL_API_VERSION")]
    pub api_version: Option<String>,

    /// Optional YAML config file.
    #[arg(long, env = "GHL_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "GHL_BURST_LIMIT")]
    pub burst_limit: Option<u32>,

    #[arg(long, env = "GHL_BURST_WINDOW_SECS")]
    pub burst_window_secs: Option<u64>,

    #[arg(long, env = "GHL_DAILY_LIMIT")]
    pub daily_limit: Option<u64>,

    /// Default tracing filter; `RUST_LOG` overrides it.
    #[arg(long, env = "GHL_GATEWAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "GHL_GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub default_location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpstreamSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default)]
    pub burst: Option<u32>,
    #[serde(default)]
    pub burst_window_secs: Option<u64>,
    #[serde(default)]
    pub daily: Option<u64>,
}

/// Read a YAML config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid config YAML.
pub fn load_file(path: &Path) -> anyhow::Result<FileConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&content).with_context(|| format!("parse {}", path.display()))
}

/// Fully resolved settings for one gateway process.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub mode: Mode,
    pub listen: SocketAddr,
    pub default_token: Option<String>,
    pub default_location: Option<String>,
    pub client: ClientConfig,
    pub limits: LimiterConfig,
}

impl GatewayConfig {
    /// Resolve the CLI (and the config file it names).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or the result fails validation.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };
        Self::from_parts(cli, file)
    }

    /// Merge CLI values over file values and validate.
    ///
    /// # Errors
    ///
    /// Returns an error for zero limits, a zero burst window or an unusable base URL.
    pub fn from_parts(cli: &Cli, file: FileConfig) -> anyhow::Result<Self> {
        let mode = Mode::resolve(cli.mode, cli.port);
        let listen = SocketAddr::new(cli.bind, cli.port.unwrap_or(DEFAULT_PORT));

        let client = ClientConfig {
            base_url: cli
                .base_url
                .clone()
                .or(file.upstream.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: cli
                .api_version
                .clone()
                .or(file.upstream.api_version)
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        };

        let burst_window_secs = cli.burst_window_secs.or(file.limits.burst_window_secs);
        let limits = LimiterConfig {
            burst_limit: cli
                .burst_limit
                .or(file.limits.burst)
                .unwrap_or(DEFAULT_BURST_LIMIT),
            burst_window: burst_window_secs.map_or(DEFAULT_BURST_WINDOW, Duration::from_secs),
            daily_limit: cli
                .daily_limit
                .or(file.limits.daily)
                .unwrap_or(DEFAULT_DAILY_LIMIT),
        };

        let cfg = Self {
            mode,
            listen,
            default_token: non_empty(cli.token.clone()),
            default_location: non_empty(cli.default_location.clone().or(file.default_location)),
            client,
            limits,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.limits.burst_limit == 0 {
            anyhow::bail!("burst limit must be greater than zero");
        }
        if self.limits.burst_window.is_zero() {
            anyhow::bail!("burst window must be greater than zero");
        }
        if self.limits.burst_window > MAX_BURST_WINDOW {
            anyhow::bail!(
                "burst window must be at most {} seconds",
                MAX_BURST_WINDOW.as_secs()
            );
        }
        if self.limits.daily_limit == 0 {
            anyhow::bail!("daily limit must be greater than zero");
        }
        let url = url::Url::parse(&self.client.base_url)
            .with_context(|| format!("invalid upstream base URL '{}'", self.client.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("upstream base URL must use http or https");
        }
        if self.client.api_version.trim().is_empty() {
            anyhow::bail!("upstream API version must not be empty");
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ghl-mcp-gateway"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse args")
    }

    #[test]
    fn port_implies_http_unless_mode_is_explicit() {
        assert_eq!(Mode::resolve(None, None), Mode::Stdio);
        assert_eq!(Mode::resolve(None, Some(8080)), Mode::Http);
        assert_eq!(Mode::resolve(Some(Mode::Stdio), Some(8080)), Mode::Stdio);

        let cfg = GatewayConfig::from_parts(
            &cli(&["--mode", "http", "--port", "4010", "--bind", "127.0.0.1"]),
            FileConfig::default(),
        )
        .expect("config");
        assert_eq!(cfg.mode, Mode::Http);
        assert_eq!(cfg.listen, "127.0.0.1:4010".parse().expect("addr"));
    }

    #[test]
    fn cli_values_override_file_values() {
        let file: FileConfig = serde_yaml::from_str(
            "upstream:\n  baseUrl: http://file.example\n  apiVersion: 2020-01-01\nlimits:\n  burst: 5\n  burstWindowSecs: 2\n  daily: 50\ndefaultLocation: loc-file\n",
        )
        .expect("yaml");
        let cfg = GatewayConfig::from_parts(
            &cli(&[
                "--mode",
                "stdio",
                "--base-url",
                "http://cli.example",
                "--burst-limit",
                "7",
                "--default-location",
                "loc-cli",
            ]),
            file,
        )
        .expect("config");
        assert_eq!(cfg.client.base_url, "http://cli.example");
        assert_eq!(cfg.client.api_version, "2020-01-01");
        assert_eq!(cfg.limits.burst_limit, 7);
        assert_eq!(cfg.limits.burst_window, Duration::from_secs(2));
        assert_eq!(cfg.limits.daily_limit, 50);
        assert_eq!(cfg.default_location.as_deref(), Some("loc-cli"));
    }

    #[test]
    fn zero_limits_are_rejected() {
        for args in [
            ["--mode", "stdio", "--burst-limit", "0"],
            ["--mode", "stdio", "--daily-limit", "0"],
            ["--mode", "stdio", "--burst-window-secs", "0"],
        ] {
            let err = GatewayConfig::from_parts(&cli(&args), FileConfig::default())
                .expect_err("zero rejected");
            assert!(err.to_string().contains("greater than zero"), "{err}");
        }
    }

    #[test]
    fn burst_window_longer_than_a_day_is_rejected() {
        let err = GatewayConfig::from_parts(
            &cli(&["--mode", "stdio", "--burst-window-secs", "10000000000000"]),
            FileConfig::default(),
        )
        .expect_err("oversized window rejected");
        assert!(err.to_string().contains("at most 86400 seconds"), "{err}");

        let cfg = GatewayConfig::from_parts(
            &cli(&["--mode", "stdio", "--burst-window-secs", "86400"]),
            FileConfig::default(),
        )
        .expect("one day accepted");
        assert_eq!(cfg.limits.burst_window, MAX_BURST_WINDOW);
    }

    #[test]
    fn base_url_must_parse() {
        let err = GatewayConfig::from_parts(
            &cli(&["--mode", "stdio", "--base-url", "not a url"]),
            FileConfig::default(),
        )
        .expect_err("bad url");
        assert!(err.to_string().contains("invalid upstream base URL"));
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "limits:\n  bursts: 3").expect("write");
        let err = load_file(file.path()).expect_err("unknown key");
        assert!(format!("{err:#}").contains("bursts"));
    }

    #[test]
    fn empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let cfg = load_file(file.path()).expect("empty");
        assert!(cfg.upstream.base_url.is_none());
        assert!(cfg.limits.burst.is_none());
    }
}
