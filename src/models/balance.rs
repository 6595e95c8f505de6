//! Derived balance and aging views.
//!
//! Nothing here is stored: every value is recomputed from the ledger and
//! donation usages on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Age bucket of an outstanding debt, by whole days since it was incurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Days0To30,
    Days31To60,
    Days61To90,
    Days90Plus,
}

impl AgingBucket {
    pub fn for_age(age_days: i64) -> Self {
        match age_days {
            ..=30 => AgingBucket::Days0To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Days90Plus,
        }
    }
}

/// A charge with part of it still unpaid after oldest-first allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingDebt {
    pub entry_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub original_cents: i64,
    pub outstanding_cents: i64,
    pub age_days: i64,
    pub bucket: AgingBucket,
}

/// Outstanding debt partitioned by age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingBuckets {
    pub as_of: DateTime<Utc>,
    pub days_0_30: i64,
    pub days_31_60: i64,
    pub days_61_90: i64,
    pub days_90_plus: i64,
    pub total_outstanding_cents: i64,
    pub debts: Vec<OutstandingDebt>,
}

/// Per-kind sums over a customer's ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub debt_cents: i64,
    pub paid_cents: i64,
    pub written_off_cents: i64,
    pub adjusted_cents: i64,
    pub donated_cents: i64,
    pub balance_cents: i64,
}

/// Where a balance stands against the customer's credit limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditStatus {
    pub balance_cents: i64,
    pub credit_limit_cents: i64,
    pub requested_cents: i64,

    /// Room left under the limit before the requested amount; never negative
    pub available_cents: i64,

    pub utilization_percent: f64,

    /// Whether balance plus the requested amount stays within the limit
    pub allowed: bool,

    pub over_by_cents: i64,
}

/// Response body of the balance endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSummary {
    pub customer_id: Uuid,
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub credit: CreditStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub additional_cents: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgingQuery {
    pub as_of: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_edges_are_inclusive() {
        assert_eq!(AgingBucket::for_age(0), AgingBucket::Days0To30);
        assert_eq!(AgingBucket::for_age(30), AgingBucket::Days0To30);
        assert_eq!(AgingBucket::for_age(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::for_age(60), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::for_age(61), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::for_age(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::for_age(91), AgingBucket::Days90Plus);
    }
}
