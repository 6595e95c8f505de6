//! Report service - derived views across all customers.
//!
//! Reports never read stored totals. Entries and usages are streamed from
//! the database, grouped per customer and handed to the balance engine.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        customer::Customer,
        donation::DonationUsage,
        ledger::{DateRange, EntryKind, LedgerEntry},
        report::{
            ActivityRecord, AgingReport, CustomerAging, DailyReconciliation, OverLimitCustomer,
            OverdueCustomer,
        },
    },
    services::balance_engine,
};

/// Upper bound on rows returned by one activity read.
const MAX_ACTIVITY_ROWS: i64 = 500;

/// Ledger of every active customer, keyed by customer id.
struct CustomerLedgers {
    customers: Vec<Customer>,
    entries: HashMap<Uuid, Vec<LedgerEntry>>,
    usages: HashMap<Uuid, Vec<DonationUsage>>,
}

impl CustomerLedgers {
    fn entries_of(&self, customer_id: Uuid) -> &[LedgerEntry] {
        self.entries.get(&customer_id).map(Vec::as_slice).unwrap_or_default()
    }

    fn usages_of(&self, customer_id: Uuid) -> &[DonationUsage] {
        self.usages.get(&customer_id).map(Vec::as_slice).unwrap_or_default()
    }
}

async fn load_active_ledgers(pool: &DbPool) -> Result<CustomerLedgers, AppError> {
    let customers = sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers WHERE is_active ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    let entries = sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT e.* FROM ledger_entries e
        JOIN customers c ON c.id = e.customer_id
        WHERE c.is_active
        ORDER BY e.customer_id, e.occurred_at, e.id
        "#,
    )
    .fetch(pool)
    .map_err(AppError::from)
    .try_fold(HashMap::<Uuid, Vec<LedgerEntry>>::new(), |mut acc, entry| async move {
        acc.entry(entry.customer_id).or_default().push(entry);
        Ok(acc)
    })
    .await?;

    let usages = sqlx::query_as::<_, DonationUsage>(
        r#"
        SELECT u.* FROM donation_usages u
        JOIN customers c ON c.id = u.customer_id
        WHERE c.is_active
        ORDER BY u.customer_id, u.applied_at, u.id
        "#,
    )
    .fetch(pool)
    .map_err(AppError::from)
    .try_fold(HashMap::<Uuid, Vec<DonationUsage>>::new(), |mut acc, usage| async move {
        acc.entry(usage.customer_id).or_default().push(usage);
        Ok(acc)
    })
    .await?;

    Ok(CustomerLedgers {
        customers,
        entries,
        usages,
    })
}

/// Aging of every active customer with outstanding debt as of `as_of`.
pub async fn aging_report(pool: &DbPool, as_of: DateTime<Utc>) -> Result<AgingReport, AppError> {
    let ledgers = load_active_ledgers(pool).await?;
    Ok(build_aging_report(&ledgers, as_of))
}

fn build_aging_report(ledgers: &CustomerLedgers, as_of: DateTime<Utc>) -> AgingReport {
    let mut report = AgingReport {
        as_of,
        days_0_30: 0,
        days_31_60: 0,
        days_61_90: 0,
        days_90_plus: 0,
        total_outstanding_cents: 0,
        customers: Vec::new(),
    };

    for customer in &ledgers.customers {
        let entries = ledgers.entries_of(customer.id);
        let usages = ledgers.usages_of(customer.id);
        let aging = balance_engine::aging_buckets(entries, usages, as_of);
        if aging.total_outstanding_cents == 0 {
            continue;
        }

        report.days_0_30 += aging.days_0_30;
        report.days_31_60 += aging.days_31_60;
        report.days_61_90 += aging.days_61_90;
        report.days_90_plus += aging.days_90_plus;
        report.total_outstanding_cents += aging.total_outstanding_cents;

        report.customers.push(CustomerAging {
            customer_id: customer.id,
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            balance_cents: balance_engine::current_balance(entries, usages),
            credit_limit_cents: customer.credit_limit_cents,
            aging,
        });
    }
    report
}

/// Customers whose oldest outstanding charge is more than `days` old,
/// most overdue first.
pub async fn overdue_customers(
    pool: &DbPool,
    days: i64,
    as_of: DateTime<Utc>,
) -> Result<Vec<OverdueCustomer>, AppError> {
    let ledgers = load_active_ledgers(pool).await?;
    Ok(find_overdue(&ledgers, days, as_of))
}

fn find_overdue(ledgers: &CustomerLedgers, days: i64, as_of: DateTime<Utc>) -> Vec<OverdueCustomer> {
    let mut overdue: Vec<OverdueCustomer> = ledgers
        .customers
        .iter()
        .filter_map(|customer| {
            let entries = ledgers.entries_of(customer.id);
            let usages = ledgers.usages_of(customer.id);
            let debts = balance_engine::outstanding_debts(entries, usages, as_of);

            let oldest = debts.first()?;
            if oldest.age_days <= days {
                return None;
            }

            Some(OverdueCustomer {
                customer_id: customer.id,
                name: customer.name.clone(),
                phone: customer.phone.clone(),
                balance_cents: balance_engine::current_balance(entries, usages),
                oldest_age_days: oldest.age_days,
                overdue_cents: debts
                    .iter()
                    .filter(|d| d.age_days > days)
                    .map(|d| d.outstanding_cents)
                    .sum(),
                grace_period_days: customer.grace_period_days,
            })
        })
        .collect();

    overdue.sort_by(|a, b| b.oldest_age_days.cmp(&a.oldest_age_days));
    overdue
}

/// Customers whose balance exceeds their credit limit, largest excess first.
pub async fn over_limit_customers(pool: &DbPool) -> Result<Vec<OverLimitCustomer>, AppError> {
    let ledgers = load_active_ledgers(pool).await?;

    let mut over: Vec<OverLimitCustomer> = ledgers
        .customers
        .iter()
        .filter_map(|customer| {
            let balance_cents = balance_engine::current_balance(
                ledgers.entries_of(customer.id),
                ledgers.usages_of(customer.id),
            );
            let status = balance_engine::credit_status(balance_cents, customer.credit_limit_cents, 0);
            (status.over_by_cents > 0).then(|| OverLimitCustomer {
                customer_id: customer.id,
                name: customer.name.clone(),
                phone: customer.phone.clone(),
                balance_cents,
                credit_limit_cents: customer.credit_limit_cents,
                over_by_cents: status.over_by_cents,
            })
        })
        .collect();

    over.sort_by(|a, b| b.over_by_cents.cmp(&a.over_by_cents));
    Ok(over)
}

/// Totals of everything recorded on one calendar day (UTC).
pub async fn daily_reconciliation(
    pool: &DbPool,
    date: NaiveDate,
) -> Result<DailyReconciliation, AppError> {
    let (start, end) = DateRange::single_day(date).bounds();

    let entries = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE occurred_at >= $1 AND occurred_at < $2 ORDER BY occurred_at, id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let usages = sqlx::query_as::<_, DonationUsage>(
        "SELECT * FROM donation_usages WHERE applied_at >= $1 AND applied_at < $2 ORDER BY applied_at, id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(reconcile(date, &entries, &usages))
}

/// Fold one day's entries and usages into reconciliation totals.
pub fn reconcile(
    date: NaiveDate,
    entries: &[LedgerEntry],
    usages: &[DonationUsage],
) -> DailyReconciliation {
    let mut day = DailyReconciliation {
        date,
        ..Default::default()
    };

    for entry in entries {
        match entry.kind {
            EntryKind::Debt => {
                day.debt_count += 1;
                day.debts_cents += entry.amount_cents;
            }
            EntryKind::Payment => {
                day.payment_count += 1;
                day.payments_cents += entry.amount_cents;
                let method = entry
                    .payment_method
                    .map(|m| m.as_str())
                    .unwrap_or("unknown");
                *day.payments_by_method.entry(method.to_string()).or_default() +=
                    entry.amount_cents;
            }
            EntryKind::WriteOff => day.write_offs_cents += entry.amount_cents,
            EntryKind::Adjustment => day.adjustments_cents += entry.amount_cents,
        }
    }
    day.donations_applied_cents = usages.iter().map(|u| u.amount_cents).sum();
    day.net_change_cents = balance_engine::current_balance(entries, usages);
    day
}

/// Entries in a date range, oldest first, optionally for one customer.
pub async fn transactions(
    pool: &DbPool,
    range: DateRange,
    customer_id: Option<Uuid>,
) -> Result<Vec<ActivityRecord>, AppError> {
    let (start, end) = range.bounds();

    let records = sqlx::query_as::<_, ActivityRecord>(
        r#"
        SELECT e.*, c.name AS customer_name
        FROM ledger_entries e
        JOIN customers c ON c.id = e.customer_id
        WHERE e.occurred_at >= $1 AND e.occurred_at < $2
          AND ($3::uuid IS NULL OR e.customer_id = $3)
        ORDER BY e.occurred_at, e.id
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Most recent entries across all customers, newest first.
pub async fn recent_activity(pool: &DbPool, limit: Option<i64>) -> Result<Vec<ActivityRecord>, AppError> {
    let limit = limit.unwrap_or(20).clamp(1, MAX_ACTIVITY_ROWS);

    let records = sqlx::query_as::<_, ActivityRecord>(
        r#"
        SELECT e.*, c.name AS customer_name
        FROM ledger_entries e
        JOIN customers c ON c.id = e.customer_id
        ORDER BY e.occurred_at DESC, e.id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ledger::PaymentMethod;
    use crate::services::balance_engine::tests::{day, entry, usage};

    fn customer(name: &str, credit_limit_cents: i64) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            notes: None,
            credit_limit_cents,
            grace_period_days: 7,
            is_active: true,
            created_at: day(0),
        }
    }

    fn owned_by(customer: &Customer, mut entries: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
        for e in &mut entries {
            e.customer_id = customer.id;
        }
        entries
    }

    fn ledgers(rows: Vec<(Customer, Vec<LedgerEntry>)>) -> CustomerLedgers {
        let mut entries = HashMap::new();
        let mut customers = Vec::new();
        for (customer, ledger) in rows {
            entries.insert(customer.id, owned_by(&customer, ledger));
            customers.push(customer);
        }
        CustomerLedgers {
            customers,
            entries,
            usages: HashMap::new(),
        }
    }

    #[test]
    fn aging_report_skips_settled_customers_and_sums_buckets() {
        let settled = customer("Ann", 50_000);
        let owing = customer("Bob", 50_000);
        let old_debtor = customer("Cy", 50_000);

        let data = ledgers(vec![
            (
                settled,
                vec![
                    entry(EntryKind::Debt, 1_000, day(0)),
                    entry(EntryKind::Payment, 1_000, day(1)),
                ],
            ),
            (owing, vec![entry(EntryKind::Debt, 2_500, day(90))]),
            (old_debtor, vec![entry(EntryKind::Debt, 4_000, day(0))]),
        ]);

        let report = build_aging_report(&data, day(100));

        assert_eq!(report.customers.len(), 2);
        assert_eq!(report.days_0_30, 2_500);
        assert_eq!(report.days_90_plus, 4_000);
        assert_eq!(report.total_outstanding_cents, 6_500);
    }

    #[test]
    fn overdue_uses_the_oldest_unpaid_charge() {
        let partly_paid = customer("Dee", 50_000);
        let fresh = customer("Eve", 50_000);

        let data = ledgers(vec![
            (
                partly_paid.clone(),
                vec![
                    entry(EntryKind::Debt, 3_000, day(0)),
                    entry(EntryKind::Debt, 2_000, day(50)),
                    entry(EntryKind::Payment, 1_000, day(55)),
                ],
            ),
            (fresh, vec![entry(EntryKind::Debt, 900, day(55))]),
        ]);

        let overdue = find_overdue(&data, 30, day(60));

        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].customer_id, partly_paid.id);
        assert_eq!(overdue[0].oldest_age_days, 60);
        assert_eq!(overdue[0].overdue_cents, 2_000);
        assert_eq!(overdue[0].balance_cents, 4_000);
    }

    #[test]
    fn fully_retired_old_debt_is_not_overdue() {
        let paid_up = customer("Fay", 50_000);
        let data = ledgers(vec![(
            paid_up,
            vec![
                entry(EntryKind::Debt, 3_000, day(0)),
                entry(EntryKind::Payment, 3_000, day(5)),
                entry(EntryKind::Debt, 500, day(58)),
            ],
        )]);

        assert!(find_overdue(&data, 30, day(60)).is_empty());
    }

    #[test]
    fn reconciliation_splits_payments_by_method() {
        let mut card = entry(EntryKind::Payment, 700, day(0));
        card.payment_method = Some(PaymentMethod::Card);
        let entries = vec![
            entry(EntryKind::Debt, 2_000, day(0)),
            entry(EntryKind::Debt, 1_000, day(0)),
            entry(EntryKind::Payment, 500, day(0)),
            card,
            entry(EntryKind::WriteOff, 100, day(0)),
        ];
        let date = day(0).date_naive();

        let totals = reconcile(date, &entries, &[usage(200, day(0))]);

        assert_eq!(totals.debt_count, 2);
        assert_eq!(totals.debts_cents, 3_000);
        assert_eq!(totals.payment_count, 2);
        assert_eq!(totals.payments_cents, 1_200);
        assert_eq!(totals.payments_by_method.get("cash"), Some(&500));
        assert_eq!(totals.payments_by_method.get("card"), Some(&700));
        assert_eq!(totals.write_offs_cents, 100);
        assert_eq!(totals.donations_applied_cents, 200);
        assert_eq!(totals.net_change_cents, 1_500);
    }
}
