//! Balance engine - folds a customer's ledger into derived views.
//!
//! The pure functions in this module are the only place balances and aging
//! are computed. The async loaders fetch a customer's entries and donation
//! usages and hand them to the fold; nothing is cached or persisted.
//!
//! # Allocation Policy
//!
//! Credits (payments, write-offs, negative adjustments, donation usages)
//! retire charges (debts, positive adjustments) oldest first, ordered by
//! (`occurred_at`, `id`). Applying all credits to the oldest charges gives
//! the same outcome as walking the ledger chronologically and carrying
//! unused credit forward, so the credits are simply pooled.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        balance::{AgingBucket, AgingBuckets, CreditStatus, LedgerTotals, OutstandingDebt},
        donation::DonationUsage,
        ledger::{EntryKind, LedgerEntry},
    },
    services::{donation_service, ledger_service},
};

/// Signed total owed: charges minus credits.
pub fn current_balance(entries: &[LedgerEntry], usages: &[DonationUsage]) -> i64 {
    let ledger: i64 = entries.iter().map(LedgerEntry::balance_effect).sum();
    let donated: i64 = usages.iter().map(|u| u.amount_cents).sum();
    ledger - donated
}

/// Per-kind sums plus the resulting balance.
pub fn totals(entries: &[LedgerEntry], usages: &[DonationUsage]) -> LedgerTotals {
    let mut totals = entries
        .iter()
        .fold(LedgerTotals::default(), |mut acc, entry| {
            match entry.kind {
                EntryKind::Debt => acc.debt_cents += entry.amount_cents,
                EntryKind::Payment => acc.paid_cents += entry.amount_cents,
                EntryKind::WriteOff => acc.written_off_cents += entry.amount_cents,
                EntryKind::Adjustment => acc.adjusted_cents += entry.amount_cents,
            }
            acc
        });
    totals.donated_cents = usages.iter().map(|u| u.amount_cents).sum();
    totals.balance_cents = current_balance(entries, usages);
    totals
}

/// Charges still partly unpaid as of `as_of`, oldest first.
///
/// Entries and usages timestamped after `as_of` are ignored.
pub fn outstanding_debts(
    entries: &[LedgerEntry],
    usages: &[DonationUsage],
    as_of: DateTime<Utc>,
) -> Vec<OutstandingDebt> {
    let mut charges: Vec<&LedgerEntry> = Vec::new();
    let mut credit_pool: i64 = usages
        .iter()
        .filter(|u| u.applied_at <= as_of)
        .map(|u| u.amount_cents)
        .sum();

    for entry in entries.iter().filter(|e| e.occurred_at <= as_of) {
        let effect = entry.balance_effect();
        if effect > 0 {
            charges.push(entry);
        } else {
            credit_pool -= effect;
        }
    }

    charges.sort_by_key(|e| (e.occurred_at, e.id));

    let today = as_of.date_naive();
    let mut outstanding = Vec::new();
    for charge in charges {
        let original_cents = charge.balance_effect();
        let retired = credit_pool.min(original_cents);
        credit_pool -= retired;

        let outstanding_cents = original_cents - retired;
        if outstanding_cents == 0 {
            continue;
        }

        let age_days = (today - charge.occurred_at.date_naive()).num_days();
        outstanding.push(OutstandingDebt {
            entry_id: charge.id,
            occurred_at: charge.occurred_at,
            original_cents,
            outstanding_cents,
            age_days,
            bucket: AgingBucket::for_age(age_days),
        });
    }
    outstanding
}

/// Partition outstanding debt into 0-30 / 31-60 / 61-90 / 90+ day buckets.
pub fn aging_buckets(
    entries: &[LedgerEntry],
    usages: &[DonationUsage],
    as_of: DateTime<Utc>,
) -> AgingBuckets {
    let debts = outstanding_debts(entries, usages, as_of);

    let mut buckets = AgingBuckets {
        as_of,
        days_0_30: 0,
        days_31_60: 0,
        days_61_90: 0,
        days_90_plus: 0,
        total_outstanding_cents: 0,
        debts: Vec::new(),
    };
    for debt in &debts {
        let slot = match debt.bucket {
            AgingBucket::Days0To30 => &mut buckets.days_0_30,
            AgingBucket::Days31To60 => &mut buckets.days_31_60,
            AgingBucket::Days61To90 => &mut buckets.days_61_90,
            AgingBucket::Days90Plus => &mut buckets.days_90_plus,
        };
        *slot += debt.outstanding_cents;
        buckets.total_outstanding_cents += debt.outstanding_cents;
    }
    buckets.debts = debts;
    buckets
}

/// Compare a balance plus a prospective charge against a credit limit.
pub fn credit_status(balance_cents: i64, credit_limit_cents: i64, requested_cents: i64) -> CreditStatus {
    let new_balance = balance_cents + requested_cents;
    let utilization_percent = if credit_limit_cents > 0 {
        balance_cents as f64 / credit_limit_cents as f64 * 100.0
    } else {
        0.0
    };

    CreditStatus {
        balance_cents,
        credit_limit_cents,
        requested_cents,
        available_cents: (credit_limit_cents - balance_cents).max(0),
        utilization_percent,
        allowed: new_balance <= credit_limit_cents,
        over_by_cents: (new_balance - credit_limit_cents).max(0),
    }
}

/// Load everything the fold needs for one customer.
pub async fn load_customer_ledger(
    pool: &DbPool,
    customer_id: Uuid,
) -> Result<(Vec<LedgerEntry>, Vec<DonationUsage>), AppError> {
    let entries: Vec<LedgerEntry> = ledger_service::list_for_customer(pool, customer_id, None)
        .try_collect()
        .await?;
    let usages = donation_service::usages_for_customer(pool, customer_id).await?;
    Ok((entries, usages))
}

/// Current signed balance of a customer.
pub async fn customer_balance(pool: &DbPool, customer_id: Uuid) -> Result<i64, AppError> {
    let (entries, usages) = load_customer_ledger(pool, customer_id).await?;
    Ok(current_balance(&entries, &usages))
}

/// Aging buckets of a customer as of the given instant.
pub async fn customer_aging(
    pool: &DbPool,
    customer_id: Uuid,
    as_of: DateTime<Utc>,
) -> Result<AgingBuckets, AppError> {
    let (entries, usages) = load_customer_ledger(pool, customer_id).await?;
    Ok(aging_buckets(&entries, &usages, as_of))
}
