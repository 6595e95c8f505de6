//! Audit trail model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a row of the `audit_log` table.
///
/// One row is written in the same transaction as every change it describes.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<Uuid>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for the audit endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub table: Option<String>,
}
