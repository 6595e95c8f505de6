//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{self, DbPool},
    error::AppError,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,

    /// Applied schema migrations
    pub migrations: i64,

    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "version": "0.1.0",
///   "migrations": 2,
///   "timestamp": "2025-06-01T09:00:00Z"
/// }
/// ```
///
/// If the database is unreachable, the standard 500 error body is returned.
pub async fn health_check(State(pool): State<DbPool>) -> Result<Json<HealthResponse>, AppError> {
    let migrations = db::applied_migrations(&pool).await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        version: env!("CARGO_PKG_VERSION"),
        migrations,
        timestamp: Utc::now(),
    }))
}
