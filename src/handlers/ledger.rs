//! Customer ledger HTTP handlers.
//!
//! This module implements the ledger endpoints under a customer:
//! - GET/POST /api/v1/customers/{id}/entries - History or append
//! - POST /api/v1/customers/{id}/debts - Append a debt from form rows
//! - POST /api/v1/customers/{id}/mark-paid - Pay off the whole balance
//! - GET /api/v1/customers/{id}/balance - Balance and credit status
//! - GET /api/v1/customers/{id}/aging - FIFO aging buckets

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        balance::{AgingBuckets, AgingQuery, BalanceQuery, BalanceSummary},
        ledger::{AppendEntryRequest, HistoryQuery, LedgerEntryWithItems},
        product::Product,
    },
    services::{balance_engine, customer_service, ledger_service, product_service},
    views::debt_form::DebtFormRequest,
};

/// Customer history in ledger order, with line items.
///
/// # Endpoint
///
/// `GET /api/v1/customers/{id}/entries?start=2025-01-01&end=2025-01-31`
///
/// Both dates are optional and inclusive.
pub async fn list_entries(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<LedgerEntryWithItems>>, AppError> {
    let range = query.range()?;
    let entries = ledger_service::history(&pool, customer_id, range).await?;
    Ok(Json(entries))
}

/// Append a ledger entry.
///
/// # Endpoint
///
/// `POST /api/v1/customers/{id}/entries`
///
/// # Request Body
///
/// ```json
/// {
///   "kind": "debt",
///   "amount_cents": 1350,
///   "items": [{ "name": "Cough Syrup", "price_cents": 450, "quantity": 3 }]
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the stored entry with its items
/// - **Error (400)**: inconsistent entry, overpayment, inactive customer
/// - **Error (404)**: unknown customer, product or referenced entry
pub async fn append_entry(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<AppendEntryRequest>,
) -> Result<(StatusCode, Json<LedgerEntryWithItems>), AppError> {
    let entry = ledger_service::append(&pool, customer_id, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Append a debt built from debt form rows.
///
/// Incomplete rows are skipped. Catalog rows are re-priced inside the write
/// transaction, so the stored amount is the item total at that moment even
/// if a product price changed after the form was read.
pub async fn add_debt_from_form(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<DebtFormRequest>,
) -> Result<(StatusCode, Json<LedgerEntryWithItems>), AppError> {
    let catalog: HashMap<Uuid, Product> =
        product_service::products_by_ids(&pool, &request.product_ids())
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

    let (form, note, occurred_at) = request.into_form(|id| catalog.get(&id))?;
    let entry_request = form.submit(note, occurred_at)?;

    let entry = ledger_service::append_at_current_prices(&pool, customer_id, entry_request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Record a cash payment for the full outstanding balance.
///
/// `POST /api/v1/customers/{id}/mark-paid`
pub async fn mark_paid(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
) -> Result<(StatusCode, Json<LedgerEntryWithItems>), AppError> {
    let entry = ledger_service::mark_paid(&pool, customer_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Balance totals and credit status.
///
/// # Endpoint
///
/// `GET /api/v1/customers/{id}/balance?additional_cents=2500`
///
/// `additional_cents` asks whether a new charge of that size would stay
/// within the credit limit.
pub async fn get_balance(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceSummary>, AppError> {
    if query.additional_cents < 0 {
        return Err(AppError::validation("Additional amount cannot be negative"));
    }

    let customer = customer_service::get_customer(&pool, customer_id).await?;
    let (entries, usages) = balance_engine::load_customer_ledger(&pool, customer_id).await?;

    let totals = balance_engine::totals(&entries, &usages);
    let credit = balance_engine::credit_status(
        totals.balance_cents,
        customer.credit_limit_cents,
        query.additional_cents,
    );

    Ok(Json(BalanceSummary {
        customer_id,
        totals,
        credit,
    }))
}

/// Outstanding debt by age, oldest debt retired first.
///
/// `GET /api/v1/customers/{id}/aging?as_of=2025-03-01T00:00:00Z` (defaults to now)
pub async fn get_aging(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<AgingQuery>,
) -> Result<Json<AgingBuckets>, AppError> {
    customer_service::get_customer(&pool, customer_id).await?;
    let as_of = query.as_of.unwrap_or_else(Utc::now);
    let aging = balance_engine::customer_aging(&pool, customer_id, as_of).await?;
    Ok(Json(aging))
}
