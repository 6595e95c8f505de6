//! Report views served by the `/reports` endpoints.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{balance::AgingBuckets, ledger::LedgerEntry};

/// One customer's line in the aging report.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerAging {
    pub customer_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub balance_cents: i64,
    pub credit_limit_cents: i64,
    #[serde(flatten)]
    pub aging: AgingBuckets,
}

/// Aging for every customer who owes something, with grand totals.
#[derive(Debug, Clone, Serialize)]
pub struct AgingReport {
    pub as_of: DateTime<Utc>,
    pub days_0_30: i64,
    pub days_31_60: i64,
    pub days_61_90: i64,
    pub days_90_plus: i64,
    pub total_outstanding_cents: i64,
    pub customers: Vec<CustomerAging>,
}

/// Customer whose oldest unpaid charge is older than the threshold.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueCustomer {
    pub customer_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub balance_cents: i64,
    pub oldest_age_days: i64,

    /// Outstanding cents on charges older than the threshold
    pub overdue_cents: i64,

    pub grace_period_days: i32,
}

/// Customer whose balance exceeds their credit limit.
#[derive(Debug, Clone, Serialize)]
pub struct OverLimitCustomer {
    pub customer_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub balance_cents: i64,
    pub credit_limit_cents: i64,
    pub over_by_cents: i64,
}

/// Everything that moved balances on one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyReconciliation {
    pub date: NaiveDate,
    pub debt_count: i64,
    pub debts_cents: i64,
    pub payment_count: i64,
    pub payments_cents: i64,
    pub payments_by_method: BTreeMap<String, i64>,
    pub write_offs_cents: i64,
    pub adjustments_cents: i64,
    pub donations_applied_cents: i64,

    /// Signed change of total receivables over the day
    pub net_change_cents: i64,
}

/// Ledger entry with the owning customer's name, for activity listings.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub customer_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OverdueQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}
