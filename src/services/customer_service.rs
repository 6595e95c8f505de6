//! Customer registry service.
//!
//! Customers are never deleted. `deactivate_customer` flips `is_active`,
//! which keeps ledger history readable while blocking new entries.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::customer::{Customer, CustomerProfile},
    services::audit,
};

/// Create a customer from a validated profile.
pub async fn create_customer(pool: &DbPool, profile: CustomerProfile) -> Result<Customer, AppError> {
    let mut tx = pool.begin().await?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, phone, email, address, notes, credit_limit_cents, grace_period_days)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&profile.name)
    .bind(&profile.phone)
    .bind(&profile.email)
    .bind(&profile.address)
    .bind(&profile.notes)
    .bind(profile.credit_limit_cents)
    .bind(profile.grace_period_days)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut *tx,
        "create",
        "customers",
        Some(customer.id),
        format!("name={}", customer.name),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(customer_id = %customer.id, "Customer created");
    Ok(customer)
}

/// Fetch one customer, active or not.
///
/// # Errors
///
/// - `NotFound` if no customer has this id
pub async fn get_customer(pool: &DbPool, customer_id: Uuid) -> Result<Customer, AppError> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))
}

/// Active customers ordered by name, optionally narrowed by a
/// case-insensitive substring of name or phone.
pub async fn list_customers(pool: &DbPool, search: Option<&str>) -> Result<Vec<Customer>, AppError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let customers = sqlx::query_as::<_, Customer>(
        r#"
        SELECT * FROM customers
        WHERE is_active
          AND ($1::text IS NULL OR name ILIKE $1 OR COALESCE(phone, '') ILIKE $1)
        ORDER BY name ASC, id ASC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(customers)
}

/// Replace the editable profile fields of a customer.
pub async fn update_customer(
    pool: &DbPool,
    customer_id: Uuid,
    profile: CustomerProfile,
) -> Result<Customer, AppError> {
    let mut tx = pool.begin().await?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET name = $2,
            phone = $3,
            email = $4,
            address = $5,
            notes = $6,
            credit_limit_cents = $7,
            grace_period_days = $8
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(customer_id)
    .bind(&profile.name)
    .bind(&profile.phone)
    .bind(&profile.email)
    .bind(&profile.address)
    .bind(&profile.notes)
    .bind(profile.credit_limit_cents)
    .bind(profile.grace_period_days)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Customer"))?;

    audit::record(
        &mut *tx,
        "update",
        "customers",
        Some(customer.id),
        format!(
            "credit_limit_cents={} grace_period_days={}",
            customer.credit_limit_cents, customer.grace_period_days
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(customer_id = %customer.id, "Customer updated");
    Ok(customer)
}

/// Soft-delete: the customer disappears from listings and accepts no new
/// entries, but every ledger row stays.
pub async fn deactivate_customer(pool: &DbPool, customer_id: Uuid) -> Result<Customer, AppError> {
    let mut tx = pool.begin().await?;

    let customer = sqlx::query_as::<_, Customer>(
        "UPDATE customers SET is_active = FALSE WHERE id = $1 RETURNING *",
    )
    .bind(customer_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Customer"))?;

    audit::record(
        &mut *tx,
        "deactivate",
        "customers",
        Some(customer.id),
        format!("name={}", customer.name),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(customer_id = %customer.id, "Customer deactivated");
    Ok(customer)
}

/// Ids of the active customers with the most recent ledger activity.
///
/// Customers without entries rank by creation time.
pub async fn recent_customer_ids(pool: &DbPool, limit: i64) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT c.id
        FROM customers c
        LEFT JOIN ledger_entries e ON e.customer_id = c.id
        WHERE c.is_active
        GROUP BY c.id
        ORDER BY COALESCE(MAX(e.occurred_at), c.created_at) DESC, c.id
        LIMIT $1
        "#,
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Escape `%`, `_` and `\` so user input matches literally in `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("john"), "john");
    }
}
