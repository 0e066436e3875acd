//! Process wiring: build the dispatcher once, then serve stdio or HTTP until cancelled.

use crate::config::{GatewayConfig, Mode};
use crate::dispatch::Dispatcher;
use crate::limiter::RateLimiter;
use crate::mcp::GatewayMcp;
use crate::rest::{self, RestState};
use anyhow::Context as _;
use axum::Router;
use ghl_crm_client::CrmClient;
use rmcp::ServiceExt as _;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Build the shared dispatcher from resolved config.
///
/// # Errors
///
/// Returns an error if the upstream client cannot be built.
pub fn build_dispatcher(cfg: &GatewayConfig) -> anyhow::Result<Dispatcher> {
    let client = CrmClient::new(&cfg.client).context("build upstream client")?;
    let limiter = Arc::new(RateLimiter::new(cfg.limits));
    Ok(Dispatcher::new(client, limiter, cfg.default_token.clone()))
}

/// MCP at `/mcp` plus the REST routes.
pub fn http_router(
    dispatcher: Dispatcher,
    default_location: Option<String>,
    shutdown: &CancellationToken,
) -> Router {
    let mcp_dispatcher = dispatcher.clone();
    let service: StreamableHttpService<GatewayMcp, LocalSessionManager> = StreamableHttpService::new(
        move || Ok(GatewayMcp::new(mcp_dispatcher.clone())),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: None,
            cancellation_token: shutdown.child_token(),
            ..Default::default()
        },
    );

    Router::new()
        .nest_service("/mcp", service)
        .merge(rest::router(RestState::new(dispatcher, default_location)))
}

/// Serve in the configured mode until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the transport fails to start or stops abnormally.
pub async fn run(cfg: GatewayConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let dispatcher = build_dispatcher(&cfg)?;
    if !dispatcher.has_default_token() {
        tracing::warn!("no default token configured; every call must carry its own token");
    }
    match cfg.mode {
        Mode::Stdio => run_stdio(dispatcher, shutdown).await,
        Mode::Http => run_http(&cfg, dispatcher, shutdown).await,
    }
}

async fn run_stdio(dispatcher: Dispatcher, shutdown: CancellationToken) -> anyhow::Result<()> {
    tracing::info!(mode = "stdio", "gateway starting");
    let running = GatewayMcp::new(dispatcher)
        .serve(rmcp::transport::stdio())
        .await
        .context("start stdio MCP server")?;

    let service_token = running.cancellation_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        service_token.cancel();
    });

    let reason = running.waiting().await.context("stdio MCP server")?;
    tracing::info!(?reason, "stdio session ended");
    Ok(())
}

async fn run_http(
    cfg: &GatewayConfig,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = http_router(dispatcher, cfg.default_location.clone(), &shutdown);
    let listener = tokio::net::TcpListener::bind(cfg.listen)
        .await
        .with_context(|| format!("bind {}", cfg.listen))?;
    let local = listener.local_addr().context("read bound address")?;
    tracing::info!(mode = "http", addr = %local, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("http server")?;
    tracing::info!("gateway stopped");
    Ok(())
}
