//! Report HTTP handlers.
//!
//! Every report is computed from the ledger on request; nothing is cached.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Datelike, Utc};

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::{
        audit::{AuditQuery, AuditRecord},
        balance::AgingQuery,
        ledger::{DateRange, HistoryQuery},
        report::{
            ActivityRecord, AgingReport, DailyQuery, DailyReconciliation, OverLimitCustomer,
            OverdueCustomer, OverdueQuery, RecentQuery, TransactionsQuery,
        },
    },
    services::{audit, report_service},
};

/// `GET /api/v1/reports/aging?as_of=...` (defaults to now)
pub async fn aging_report(
    State(pool): State<DbPool>,
    Query(query): Query<AgingQuery>,
) -> Result<Json<AgingReport>, AppError> {
    let as_of = query.as_of.unwrap_or_else(Utc::now);
    let report = report_service::aging_report(&pool, as_of).await?;
    Ok(Json(report))
}

/// Customers with debt older than `days` (default from configuration).
///
/// `GET /api/v1/reports/overdue?days=30`
pub async fn overdue_report(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Query(query): Query<OverdueQuery>,
) -> Result<Json<Vec<OverdueCustomer>>, AppError> {
    let days = query.days.unwrap_or(config.overdue_threshold_days);
    if days < 0 {
        return Err(AppError::validation("Days cannot be negative"));
    }

    let customers = report_service::overdue_customers(&pool, days, Utc::now()).await?;
    Ok(Json(customers))
}

pub async fn over_limit_report(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<OverLimitCustomer>>, AppError> {
    let customers = report_service::over_limit_customers(&pool).await?;
    Ok(Json(customers))
}

/// `GET /api/v1/reports/daily?date=2025-06-01` (defaults to today, UTC)
pub async fn daily_report(
    State(pool): State<DbPool>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<DailyReconciliation>, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let report = report_service::daily_reconciliation(&pool, date).await?;
    Ok(Json(report))
}

/// Entries between two dates, inclusive.
///
/// `GET /api/v1/reports/transactions?start=2025-06-01&end=2025-06-30&customer_id=...`
///
/// Without `start`/`end`, the current month so far is used.
pub async fn transactions_report(
    State(pool): State<DbPool>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<ActivityRecord>>, AppError> {
    let range = match (HistoryQuery {
        start: query.start,
        end: query.end,
    })
    .range()?
    {
        Some(range) => range,
        None => month_to_date(),
    };

    let records = report_service::transactions(&pool, range, query.customer_id).await?;
    Ok(Json(records))
}

fn month_to_date() -> DateRange {
    let today = Utc::now().date_naive();
    let first = today.with_day0(0).unwrap_or(today);
    DateRange {
        start: first,
        end: today,
    }
}

/// `GET /api/v1/reports/recent?limit=20`
pub async fn recent_activity(
    State(pool): State<DbPool>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<ActivityRecord>>, AppError> {
    let records = report_service::recent_activity(&pool, query.limit).await?;
    Ok(Json(records))
}

/// Audit trail, newest first.
///
/// `GET /api/v1/audit?limit=100&table=ledger_entries`
pub async fn audit_log(
    State(pool): State<DbPool>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditRecord>>, AppError> {
    let records = audit::list(&pool, query.limit, query.table.as_deref()).await?;
    Ok(Json(records))
}
