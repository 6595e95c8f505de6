//! Ledger service - append-only customer ledger.
//!
//! This service handles:
//! - Validating and appending entries with their line items
//! - Lazy, time-ordered reads of a customer's entries
//! - Attaching line items to debt entries for history views
//!
//! # Atomicity Guarantees
//!
//! An entry, its items and its audit row are written in one PostgreSQL
//! transaction. The customer row is locked with `FOR UPDATE` first, so
//! concurrent appends and donation usages for one customer see each other's
//! balance effects.
//! Returning early with `?` drops the transaction, which rolls it back.
//!
//! There is no update or delete: corrections are new, compensating entries.

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        customer::Customer,
        ledger::{
            AppendEntryRequest, DateRange, EntryKind, ItemSource, LedgerEntry,
            LedgerEntryWithItems, LedgerItem, NewEntry, PaymentMethod, ResolvedItem,
            ValidatedItem, check_debt_total, items_total,
        },
        product::Product,
    },
    services::{audit, balance_engine, customer_service, donation_service},
};

const LIST_FOR_CUSTOMER_SQL: &str = r#"
    SELECT * FROM ledger_entries
    WHERE customer_id = $1
      AND ($2::timestamptz IS NULL OR occurred_at >= $2)
      AND ($3::timestamptz IS NULL OR occurred_at < $3)
    ORDER BY occurred_at ASC, id ASC
"#;

/// Stream a customer's entries in ledger order: `occurred_at`, then `id`.
///
/// The stream is lazy and finite; calling again starts a fresh read.
/// An unknown customer simply yields nothing.
pub fn list_for_customer(
    pool: &DbPool,
    customer_id: Uuid,
    range: Option<DateRange>,
) -> BoxStream<'_, Result<LedgerEntry, AppError>> {
    let (start, end) = match range {
        Some(range) => {
            let (start, end) = range.bounds();
            (Some(start), Some(end))
        }
        None => (None, None),
    };

    sqlx::query_as::<_, LedgerEntry>(LIST_FOR_CUSTOMER_SQL)
        .bind(customer_id)
        .bind(start)
        .bind(end)
        .fetch(pool)
        .map_err(AppError::from)
        .boxed()
}

/// A customer's entries in ledger order with line items attached.
///
/// # Errors
///
/// - `NotFound` if the customer does not exist
pub async fn history(
    pool: &DbPool,
    customer_id: Uuid,
    range: Option<DateRange>,
) -> Result<Vec<LedgerEntryWithItems>, AppError> {
    customer_service::get_customer(pool, customer_id).await?;

    let entries: Vec<LedgerEntry> = list_for_customer(pool, customer_id, range)
        .try_collect()
        .await?;
    attach_items(pool, entries).await
}

/// Pair each entry with its line items (empty for non-debts).
pub async fn attach_items(
    pool: &DbPool,
    entries: Vec<LedgerEntry>,
) -> Result<Vec<LedgerEntryWithItems>, AppError> {
    let debt_ids: Vec<Uuid> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Debt)
        .map(|e| e.id)
        .collect();
    let mut items = items_for_entries(pool, &debt_ids).await?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let items = items.remove(&entry.id).unwrap_or_default();
            LedgerEntryWithItems { entry, items }
        })
        .collect())
}

/// Line items grouped by their entry.
pub async fn items_for_entries(
    pool: &DbPool,
    entry_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<LedgerItem>>, AppError> {
    if entry_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, LedgerItem>(
        "SELECT * FROM ledger_items WHERE entry_id = ANY($1) ORDER BY entry_id, id",
    )
    .bind(entry_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<LedgerItem>> = HashMap::new();
    for item in rows {
        grouped.entry(item.entry_id).or_default().push(item);
    }
    Ok(grouped)
}

/// Validate and append one entry.
///
/// # Process
///
/// 1. Structural validation (amount sign, items, payment method)
/// 2. Lock the customer row; reject unknown or inactive customers
/// 3. Resolve catalog items, copying name and price
/// 4. Check debt total against items, or payment against balance
/// 5. Insert entry, items and audit row; commit
///
/// # Errors
///
/// - `Validation`: inconsistent entry; nothing is written
/// - `NotFound`: unknown customer, product or referenced entry
/// - `Database`: database error occurred
pub async fn append(
    pool: &DbPool,
    customer_id: Uuid,
    request: AppendEntryRequest,
) -> Result<LedgerEntryWithItems, AppError> {
    let entry = request.validate()?;
    append_validated(pool, customer_id, entry).await
}

/// Append an entry that already passed structural validation.
pub async fn append_validated(
    pool: &DbPool,
    customer_id: Uuid,
    entry: NewEntry,
) -> Result<LedgerEntryWithItems, AppError> {
    append_in_tx(pool, customer_id, entry, DebtAmount::Declared).await
}

/// Append a debt priced from the catalog as it stands inside the
/// transaction. The request amount is replaced by the resolved item total,
/// so a catalog price edited after the caller built the request cannot turn
/// into an amount mismatch.
///
/// Used for debt form submissions.
pub async fn append_at_current_prices(
    pool: &DbPool,
    customer_id: Uuid,
    request: AppendEntryRequest,
) -> Result<LedgerEntryWithItems, AppError> {
    let entry = request.validate()?;
    if entry.kind != EntryKind::Debt {
        return Err(AppError::validation("Only debts can be priced from the catalog"));
    }
    append_in_tx(pool, customer_id, entry, DebtAmount::FromItems).await
}

/// Where a debt's stored amount comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebtAmount {
    /// The caller's amount, which must equal the item total
    Declared,
    /// The item total at resolution time
    FromItems,
}

async fn append_in_tx(
    pool: &DbPool,
    customer_id: Uuid,
    mut entry: NewEntry,
    debt_amount: DebtAmount,
) -> Result<LedgerEntryWithItems, AppError> {
    let mut tx = pool.begin().await?;

    let customer = lock_active_customer(&mut tx, customer_id).await?;

    if let Some(reference_id) = entry.reference_id {
        let belongs: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ledger_entries WHERE id = $1 AND customer_id = $2)",
        )
        .bind(reference_id)
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;

        if !belongs {
            return Err(AppError::NotFound("Referenced ledger entry"));
        }
    }

    let items = resolve_items(&mut tx, entry.items).await?;

    match entry.kind {
        EntryKind::Debt => match debt_amount {
            DebtAmount::Declared => check_debt_total(entry.amount_cents, &items)?,
            DebtAmount::FromItems => {
                entry.amount_cents = items_total(&items)?;
                if entry.amount_cents <= 0 {
                    return Err(AppError::validation("Debt total must be greater than zero"));
                }
            }
        },
        EntryKind::Payment => {
            let balance = balance_in_tx(&mut tx, customer_id).await?;
            check_payment(balance, entry.amount_cents)?;
        }
        EntryKind::Adjustment | EntryKind::WriteOff => {}
    }

    let stored = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO ledger_entries (
            customer_id,
            kind,
            amount_cents,
            payment_method,
            rx_number,
            note,
            reference_id,
            occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
        RETURNING *
        "#,
    )
    .bind(customer.id)
    .bind(entry.kind.as_str())
    .bind(entry.amount_cents)
    .bind(entry.payment_method.as_ref().map(PaymentMethod::as_str))
    .bind(entry.rx_number)
    .bind(entry.note)
    .bind(entry.reference_id)
    .bind(entry.occurred_at)
    .fetch_one(&mut *tx)
    .await?;

    let mut stored_items = Vec::with_capacity(items.len());
    for item in items {
        let row = sqlx::query_as::<_, LedgerItem>(
            r#"
            INSERT INTO ledger_items (entry_id, product_id, product_name, price_cents, quantity, rx_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(stored.id)
        .bind(item.product_id)
        .bind(item.product_name)
        .bind(item.price_cents)
        .bind(item.quantity)
        .bind(item.rx_number)
        .fetch_one(&mut *tx)
        .await?;
        stored_items.push(row);
    }

    audit::record(
        &mut *tx,
        &format!("add_{}", stored.kind),
        "ledger_entries",
        Some(stored.id),
        format!("customer={} amount_cents={}", customer.id, stored.amount_cents),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        entry_id = %stored.id,
        customer_id = %customer.id,
        kind = %stored.kind,
        amount_cents = stored.amount_cents,
        "Ledger entry appended"
    );

    Ok(LedgerEntryWithItems {
        entry: stored,
        items: stored_items,
    })
}

/// Pay off the whole current balance in cash.
///
/// # Errors
///
/// - `Validation` if the customer owes nothing
/// - `NotFound` if the customer does not exist
pub async fn mark_paid(pool: &DbPool, customer_id: Uuid) -> Result<LedgerEntryWithItems, AppError> {
    customer_service::get_customer(pool, customer_id).await?;
    let balance = balance_engine::customer_balance(pool, customer_id).await?;
    if balance <= 0 {
        return Err(AppError::validation(
            "Customer has no outstanding balance to mark as paid",
        ));
    }

    // The balance is re-checked under the customer lock inside the append.
    let entry = NewEntry {
        kind: EntryKind::Payment,
        amount_cents: balance,
        payment_method: Some(PaymentMethod::Cash),
        note: Some("Marked as paid (full balance)".to_string()),
        rx_number: None,
        reference_id: None,
        occurred_at: None,
        items: Vec::new(),
    };
    append_validated(pool, customer_id, entry).await
}

/// A payment must not exceed what is owed, and needs something owed.
pub fn check_payment(balance_cents: i64, amount_cents: i64) -> Result<(), AppError> {
    if balance_cents < 0 {
        return Err(AppError::validation(format!(
            "Customer has a credit balance of {} cents. Cannot accept additional payments.",
            -balance_cents
        )));
    }
    if balance_cents == 0 {
        return Err(AppError::validation(
            "Customer has no outstanding balance to pay",
        ));
    }
    if amount_cents > balance_cents {
        return Err(AppError::validation(format!(
            "Payment amount ({amount_cents} cents) exceeds current balance ({balance_cents} cents)"
        )));
    }
    Ok(())
}

async fn lock_active_customer(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
) -> Result<Customer, AppError> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 FOR UPDATE")
        .bind(customer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    if !customer.is_active {
        return Err(AppError::validation(
            "Cannot add entries for a deactivated customer",
        ));
    }
    Ok(customer)
}

async fn resolve_items(
    tx: &mut Transaction<'_, Postgres>,
    items: Vec<ValidatedItem>,
) -> Result<Vec<ResolvedItem>, AppError> {
    let mut resolved = Vec::with_capacity(items.len());
    for item in items {
        let (product_id, product_name, price_cents) = match item.source {
            ItemSource::Product(product_id) => {
                let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
                    .bind(product_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(AppError::NotFound("Product"))?;
                (Some(product.id), product.name, product.price_cents)
            }
            ItemSource::Custom { name, price_cents } => (None, name, price_cents),
        };

        resolved.push(ResolvedItem {
            product_id,
            product_name,
            price_cents,
            quantity: item.quantity,
            rx_number: item.rx_number,
        });
    }
    Ok(resolved)
}

async fn balance_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
) -> Result<i64, AppError> {
    let entries = sqlx::query_as::<_, LedgerEntry>(LIST_FOR_CUSTOMER_SQL)
        .bind(customer_id)
        .bind(None::<chrono::DateTime<chrono::Utc>>)
        .bind(None::<chrono::DateTime<chrono::Utc>>)
        .fetch_all(&mut **tx)
        .await?;
    let usages = donation_service::usages_for_customer(&mut **tx, customer_id).await?;
    Ok(balance_engine::current_balance(&entries, &usages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_within_balance_is_accepted() {
        assert!(check_payment(5_000, 5_000).is_ok());
        assert!(check_payment(5_000, 1).is_ok());
    }

    #[test]
    fn overpayment_is_rejected() {
        let err = check_payment(5_000, 5_001).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("exceeds current balance")));
    }

    #[test]
    fn nothing_owed_means_no_payment() {
        assert!(check_payment(0, 100).is_err());
        let err = check_payment(-300, 100).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("credit balance of 300")));
    }
}
