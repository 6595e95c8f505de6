//! Donation ledger service.
//!
//! Donations are recorded once and drawn down by usages. Applying a usage
//! locks the customer row and then the donation row. The donation lock
//! keeps the used total within the donated amount; the customer lock
//! orders the usage against payments checked on that customer's balance.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        customer::Customer,
        donation::{
            ApplyDonationRequest, Donation, DonationBalance, DonationTotals, DonationUsage,
            DonationUsageRecord, RecordDonationRequest, check_application,
        },
    },
    services::audit,
};

const DONATION_BALANCE_SELECT: &str = r#"
    SELECT d.*,
           COALESCE(SUM(u.amount_cents), 0)::BIGINT AS used_cents,
           (d.amount_cents - COALESCE(SUM(u.amount_cents), 0))::BIGINT AS remaining_cents
    FROM donations d
    LEFT JOIN donation_usages u ON u.donation_id = d.id
"#;

/// Record a donation; the request must already be validated.
pub async fn record_donation(
    pool: &DbPool,
    request: RecordDonationRequest,
) -> Result<Donation, AppError> {
    let mut tx = pool.begin().await?;

    let donation = sqlx::query_as::<_, Donation>(
        r#"
        INSERT INTO donations (amount_cents, donor_name, source_note, donated_at)
        VALUES ($1, $2, $3, COALESCE($4, NOW()))
        RETURNING *
        "#,
    )
    .bind(request.amount_cents)
    .bind(&request.donor_name)
    .bind(&request.source_note)
    .bind(request.donated_at)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut *tx,
        "record_donation",
        "donations",
        Some(donation.id),
        format!("amount_cents={}", donation.amount_cents),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        donation_id = %donation.id,
        amount_cents = donation.amount_cents,
        "Donation recorded"
    );
    Ok(donation)
}

/// All donations, newest first, with used and remaining amounts.
pub async fn list_donations(pool: &DbPool) -> Result<Vec<DonationBalance>, AppError> {
    let query = format!("{DONATION_BALANCE_SELECT} GROUP BY d.id ORDER BY d.donated_at DESC, d.id");
    let donations = sqlx::query_as::<_, DonationBalance>(&query)
        .fetch_all(pool)
        .await?;
    Ok(donations)
}

pub async fn get_donation(pool: &DbPool, donation_id: Uuid) -> Result<DonationBalance, AppError> {
    let query = format!("{DONATION_BALANCE_SELECT} WHERE d.id = $1 GROUP BY d.id");
    sqlx::query_as::<_, DonationBalance>(&query)
        .bind(donation_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Donation"))
}

/// Donated, used and still available totals across every donation.
pub async fn totals(pool: &DbPool) -> Result<DonationTotals, AppError> {
    let (donated_cents, used_cents): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COALESCE(SUM(amount_cents), 0) FROM donations)::BIGINT,
            (SELECT COALESCE(SUM(amount_cents), 0) FROM donation_usages)::BIGINT
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(DonationTotals {
        donated_cents,
        used_cents,
        available_cents: donated_cents - used_cents,
    })
}

/// Usage history, newest first, optionally for one donation.
pub async fn usage_history(
    pool: &DbPool,
    donation_id: Option<Uuid>,
) -> Result<Vec<DonationUsageRecord>, AppError> {
    let usages = sqlx::query_as::<_, DonationUsageRecord>(
        r#"
        SELECT u.*,
               c.name AS customer_name,
               d.donor_name,
               d.amount_cents AS donation_amount_cents
        FROM donation_usages u
        JOIN customers c ON c.id = u.customer_id
        JOIN donations d ON d.id = u.donation_id
        WHERE ($1::uuid IS NULL OR u.donation_id = $1)
        ORDER BY u.applied_at DESC, u.id
        "#,
    )
    .bind(donation_id)
    .fetch_all(pool)
    .await?;

    Ok(usages)
}

/// Usages applied to one customer, oldest first.
///
/// Takes any executor so the ledger service can read inside its own
/// transaction.
pub async fn usages_for_customer<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    customer_id: Uuid,
) -> Result<Vec<DonationUsage>, AppError> {
    let usages = sqlx::query_as::<_, DonationUsage>(
        "SELECT * FROM donation_usages WHERE customer_id = $1 ORDER BY applied_at, id",
    )
    .bind(customer_id)
    .fetch_all(executor)
    .await?;

    Ok(usages)
}

/// Apply part of a donation to a customer's balance.
///
/// # Process
///
/// 1. Lock the customer row, then the donation row (`FOR UPDATE`), so a
///    usage serializes with payments checked against the same balance
/// 2. Check the customer is active
/// 3. Sum existing usages and check the request fits in the remainder
/// 4. Insert the usage and its audit row; commit
///
/// # Errors
///
/// - `NotFound`: unknown donation or customer
/// - `Validation`: non-positive amount or inactive customer
/// - `OverApplication`: amount exceeds what is left; nothing is written
pub async fn apply_donation(
    pool: &DbPool,
    donation_id: Uuid,
    request: ApplyDonationRequest,
) -> Result<DonationUsage, AppError> {
    let note = crate::validation::optional_text(request.note.as_deref(), "Note", 500)?;
    crate::validation::positive_amount(request.amount_cents, "Usage amount")?;

    let mut tx = pool.begin().await?;

    // Customer before donation, the same order as ledger appends take it.
    let customer =
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 FOR UPDATE")
            .bind(request.customer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Customer"))?;

    if !customer.is_active {
        return Err(AppError::validation(
            "Cannot apply donations to a deactivated customer",
        ));
    }

    let donation = sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE id = $1 FOR UPDATE")
        .bind(donation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Donation"))?;

    let used_cents: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM donation_usages WHERE donation_id = $1",
    )
    .bind(donation.id)
    .fetch_one(&mut *tx)
    .await?;

    let remaining_after = match check_application(donation.amount_cents, used_cents, request.amount_cents) {
        Ok(remaining) => remaining,
        Err(err) => {
            tracing::warn!(
                donation_id = %donation.id,
                requested_cents = request.amount_cents,
                "Donation over-application rejected"
            );
            return Err(err);
        }
    };

    let usage = sqlx::query_as::<_, DonationUsage>(
        r#"
        INSERT INTO donation_usages (donation_id, customer_id, amount_cents, note)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(donation.id)
    .bind(customer.id)
    .bind(request.amount_cents)
    .bind(note)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut *tx,
        "apply_donation",
        "donation_usages",
        Some(usage.id),
        format!(
            "donation={} customer={} amount_cents={} remaining_cents={}",
            donation.id, customer.id, usage.amount_cents, remaining_after
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        usage_id = %usage.id,
        donation_id = %donation.id,
        customer_id = %customer.id,
        amount_cents = usage.amount_cents,
        "Donation applied"
    );
    Ok(usage)
}
