//! Pharmacy customer ledger service.
//!
//! Library root: the binary in `main.rs` and the integration tests both
//! build the router from here.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod validation;
pub mod views;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
use db::DbPool;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Build the HTTP router with every route and middleware layer.
pub fn router(state: AppState) -> Router {
    let customer_routes: Router<AppState> = Router::new()
        .route(
            "/api/v1/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/api/v1/customers/cards",
            get(handlers::customers::customer_cards),
        )
        .route(
            "/api/v1/customers/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::deactivate_customer),
        )
        // Ledger routes
        .route(
            "/api/v1/customers/{id}/entries",
            get(handlers::ledger::list_entries).post(handlers::ledger::append_entry),
        )
        .route(
            "/api/v1/customers/{id}/debts",
            post(handlers::ledger::add_debt_from_form),
        )
        .route(
            "/api/v1/customers/{id}/mark-paid",
            post(handlers::ledger::mark_paid),
        )
        .route(
            "/api/v1/customers/{id}/balance",
            get(handlers::ledger::get_balance),
        )
        .route("/api/v1/customers/{id}/aging", get(handlers::ledger::get_aging));

    let catalog_routes: Router<AppState> = Router::new()
        .route(
            "/api/v1/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/v1/products/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        );

    let donation_routes: Router<AppState> = Router::new()
        .route(
            "/api/v1/donations",
            get(handlers::donations::list_donations).post(handlers::donations::record_donation),
        )
        .route(
            "/api/v1/donations/summary",
            get(handlers::donations::donation_summary),
        )
        .route(
            "/api/v1/donations/usages",
            get(handlers::donations::list_usages),
        )
        .route(
            "/api/v1/donations/{id}",
            get(handlers::donations::get_donation),
        )
        .route(
            "/api/v1/donations/{id}/apply",
            post(handlers::donations::apply_donation),
        );

    let report_routes: Router<AppState> = Router::new()
        .route("/api/v1/reports/aging", get(handlers::reports::aging_report))
        .route(
            "/api/v1/reports/overdue",
            get(handlers::reports::overdue_report),
        )
        .route(
            "/api/v1/reports/over-limit",
            get(handlers::reports::over_limit_report),
        )
        .route("/api/v1/reports/daily", get(handlers::reports::daily_report))
        .route(
            "/api/v1/reports/transactions",
            get(handlers::reports::transactions_report),
        )
        .route(
            "/api/v1/reports/recent",
            get(handlers::reports::recent_activity),
        )
        .route("/api/v1/audit", get(handlers::reports::audit_log));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(customer_routes)
        .merge(catalog_routes)
        .merge(donation_routes)
        .merge(report_routes)
        .layer(CorsLayer::permissive())
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
