//! Audit trail writer and reader.
//!
//! Writers pass their open transaction so the audit row commits or rolls
//! back together with the change it records.

use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::audit::AuditRecord};

/// Upper bound on rows returned by one audit read.
const MAX_AUDIT_ROWS: i64 = 500;

/// Append one audit row.
pub async fn record<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    action: &str,
    table_name: &str,
    record_id: Option<Uuid>,
    details: impl Into<Option<String>>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (action, table_name, record_id, details)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(action)
    .bind(table_name)
    .bind(record_id)
    .bind(details.into())
    .execute(executor)
    .await?;

    Ok(())
}

/// Most recent audit rows, newest first, optionally for one table.
pub async fn list(
    pool: &DbPool,
    limit: Option<i64>,
    table_name: Option<&str>,
) -> Result<Vec<AuditRecord>, AppError> {
    let limit = limit.unwrap_or(100).clamp(1, MAX_AUDIT_ROWS);

    let records = sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT id, action, table_name, record_id, details, created_at
        FROM audit_log
        WHERE ($1::text IS NULL OR table_name = $1)
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(table_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
