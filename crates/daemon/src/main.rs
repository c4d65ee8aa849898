//! Bindery Daemon - Main Entry Point
//! REST routes and JSON-RPC endpoints for the registered remote classes

mod config;
mod sample;
mod server;

use anyhow::{Context, Result};
use bindery_api_rpc::JsonRpcAdapter;
use bindery_core::application::route_table::{self, DeclaredRoutes};
use bindery_core::port::Registry;
use config::ServerConfig;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format = std::env::var("BINDERY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("bindery=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Bindery v{} starting...", VERSION);

    // 2. Load configuration
    let config = ServerConfig::from_env();
    info!(
        addr = %config.addr(),
        xml = config.xml,
        expose_stack = config.expose_stack,
        "Configuration loaded"
    );

    // 3. Registry and route table
    let registry = Arc::new(sample::registry().context("Registry setup failed")?);
    let routes = route_table::build(&registry.classes(), &DeclaredRoutes)
        .context("Route table build failed")?;
    info!(routes = routes.len(), "REST route table built");

    // 4. JSON-RPC endpoints
    let adapter = JsonRpcAdapter::new(registry, config.rpc_config());
    let rpc = adapter
        .create_handler()
        .context("JSON-RPC handler setup failed")?;
    info!(endpoints = rpc.paths().len(), "JSON-RPC endpoints ready");

    // 5. Serve
    let app = server::build_router(routes, rpc, config.context_options())
        .context("Router setup failed")?;
    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.addr()))?;

    info!(addr = %config.addr(), "Listening. Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received. Exiting gracefully...");
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutdown complete.");
    Ok(())
}
