//! azuread-gate - multitenant Azure AD sign-in gate
//!
//! Signs users in with OpenID Connect against Azure AD, admits only onboarded
//! tenants or provisioned users, and keeps sessions server-side.

#![deny(clippy::all)]

mod app;
mod auth;
mod config;
mod directory;
mod error;
mod pages;
mod secure;
mod session;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use app::{build_router, AppState};
use auth::token_cache::MemoryTokenCache;
use auth::token_client::build_http_client;
use config::Config;
use directory::InMemoryDirectory;
use session::MemoryTicketStore;

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            init_logging("info");
            error!("Failed to load configuration: {:#}", e);
            eprintln!("Configuration error: {:#}", e);
            eprintln!("\nPlease set the following environment variables:");
            eprintln!("  AZUREAD_CLIENT_ID=<your-azure-ad-client-id>");
            eprintln!("  AZUREAD_CLIENT_SECRET=<your-azure-ad-client-secret>");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging.level);
    info!("Starting {} v{}", config.app.name, env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

async fn run(config: Config) -> Result<()> {
    let http_client = build_http_client().context("Failed to create HTTP client")?;

    let directory = Arc::new(InMemoryDirectory::from_config(&config.directory));
    info!(
        tenants = directory.tenant_count().await,
        users = directory.user_count().await,
        "Directory loaded"
    );

    let tickets = Arc::new(MemoryTicketStore::new(chrono::Duration::minutes(
        config.session.sliding_expiration_minutes,
    )));
    let token_cache = Arc::new(MemoryTokenCache::new());

    tickets
        .clone()
        .spawn_sweeper(Duration::from_secs(config.session.sweep_interval_seconds));
    token_cache
        .clone()
        .spawn_sweeper(Duration::from_secs(config.token_cache.sweep_interval_seconds));

    let bind_addr = config.server.bind_addr.clone();
    let state = AppState::new(
        config,
        directory.clone(),
        directory,
        tickets,
        token_cache,
        http_client,
    );
    info!(authority = %state.oidc.options().authority, "OpenID Connect configured");

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
