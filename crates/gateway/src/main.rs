use clap::Parser as _;
use ghl_mcp_gateway::config::{Cli, GatewayConfig};
use ghl_mcp_gateway::{logging, server};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let cfg = GatewayConfig::load(&cli)?;
    tracing::debug!(
        mode = cfg.mode.as_str(),
        base_url = %cfg.client.base_url,
        burst_limit = cfg.limits.burst_limit,
        daily_limit = cfg.limits.daily_limit,
        "configuration loaded"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
            }
            shutdown.cancel();
        }
    });

    server::run(cfg, shutdown).await
}
