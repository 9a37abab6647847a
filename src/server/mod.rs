//! HTTP surface: workflow trigger proxy, log stream and health check.

pub mod api;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AutofixConfig;
use crate::kestra::{KestraClient, Orchestrator};
use api::AppState;

/// Options for `autofix serve`.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub port: u16,
    pub dev_mode: bool,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router().with_state(state)
}

/// Start the server and block until Ctrl+C.
pub async fn start_server(config: &AutofixConfig, options: ServeOptions) -> Result<()> {
    let orchestrator: Arc<dyn Orchestrator> = Arc::new(KestraClient::new(&config.kestra));
    let state = Arc::new(AppState {
        orchestrator,
        relay: config.relay.clone(),
        default_api_key: config.completion.api_key.clone(),
    });

    let mut app = build_router(state);
    if options.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if options.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, options.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, kestra = %config.kestra.url, "autofix server listening");
    println!("autofix server running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
