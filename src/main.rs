//! Pharmacy Ledger Service - Main Application Entry Point
//!
//! A REST API server that keeps an append-only ledger of customer debts
//! and payments, folds it into balances and FIFO aging buckets on read, and
//! tracks donations applied against customer balances.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Format**: JSON requests/responses, amounts in integer cents
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Optionally seed demo data into an empty database
//! 5. Build HTTP router and start server on configured port

use pharmacy_ledger_server::{AppState, Config, db, router, services::seed};
use tracing_subscriber::EnvFilter;

/// Customers created by the demo seed.
const DEMO_CUSTOMERS: usize = 40;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    if config.seed_demo_data {
        seed::seed_demo_data(&pool, DEMO_CUSTOMERS).await?;
    }

    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
