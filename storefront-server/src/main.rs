//! storefront-server — Order lifecycle and inventory consistency engine
//!
//! Long-running service that:
//! - Serves the public catalog and creates checkout sessions
//! - Reconciles payment processor webhooks into exactly-once orders and
//!   stock decrements
//! - Provides the admin console API (products, featured set, orders)
//! - Runs a compensating sweep that catches missed refund deliveries

mod api;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod reconcile;
mod state;
mod stripe;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting storefront-server (env: {})", config.environment);

    // Initialize application state (runs pending migrations)
    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone());

    // Compensating refund sweep
    reconcile::sweep::spawn_refund_sweep(state.clone(), config.refund_sweep_secs);

    // Periodic admin session cache cleanup (every 5 minutes)
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            sessions.cleanup();
        }
    });

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("storefront-server listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
