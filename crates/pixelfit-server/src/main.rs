//! PixelFit Billing Relay
//!
//! Axum server sitting between the PixelFit frontend and Stripe: checkout,
//! pro-status lookup, billing portal, and the Stripe webhook.

mod config;
mod error;
mod handlers;
mod origin;
mod routes;
mod state;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration (see .env.example)")?;

    let addr = config.bind_addr();
    let mode = config.mode.clone();
    let port = config.port;

    tracing::info!(origins = ?config.allowed_origins, "Allowed origins");

    let app = build_router(AppState::with_stripe(config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("PixelFit API started");
    tracing::info!("  Port: {port}");
    tracing::info!("  Mode: {mode}");
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                             - Health check");
    tracing::info!("  POST /api/create-checkout-session  - Start Pro checkout");
    tracing::info!("  GET  /api/pro-status?email=        - Check subscription");
    tracing::info!("  POST /api/create-portal-session    - Billing portal");
    tracing::info!("  POST /api/webhook                  - Stripe webhook");

    axum::serve(listener, app).await?;

    Ok(())
}
