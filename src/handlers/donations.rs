//! Donation ledger HTTP handlers.
//!
//! - GET/POST /api/v1/donations - List with remaining amounts, or record
//! - GET /api/v1/donations/summary - Donated, used and available totals
//! - GET /api/v1/donations/usages - Usage history
//! - GET /api/v1/donations/{id} - One donation
//! - POST /api/v1/donations/{id}/apply - Apply to a customer

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::donation::{
        ApplyDonationRequest, Donation, DonationBalance, DonationTotals, DonationUsage,
        DonationUsageRecord, RecordDonationRequest,
    },
    services::donation_service,
};

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub donation_id: Option<Uuid>,
}

pub async fn list_donations(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<DonationBalance>>, AppError> {
    let donations = donation_service::list_donations(&pool).await?;
    Ok(Json(donations))
}

/// `POST /api/v1/donations`
///
/// ```json
/// { "amount_cents": 10000, "donor_name": "Local Rotary Club" }
/// ```
pub async fn record_donation(
    State(pool): State<DbPool>,
    Json(request): Json<RecordDonationRequest>,
) -> Result<(StatusCode, Json<Donation>), AppError> {
    let donation = donation_service::record_donation(&pool, request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(donation)))
}

pub async fn get_donation(
    State(pool): State<DbPool>,
    Path(donation_id): Path<Uuid>,
) -> Result<Json<DonationBalance>, AppError> {
    let donation = donation_service::get_donation(&pool, donation_id).await?;
    Ok(Json(donation))
}

pub async fn donation_summary(State(pool): State<DbPool>) -> Result<Json<DonationTotals>, AppError> {
    let totals = donation_service::totals(&pool).await?;
    Ok(Json(totals))
}

pub async fn list_usages(
    State(pool): State<DbPool>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<Vec<DonationUsageRecord>>, AppError> {
    let usages = donation_service::usage_history(&pool, query.donation_id).await?;
    Ok(Json(usages))
}

/// Apply part of a donation to a customer's balance.
///
/// # Endpoint
///
/// `POST /api/v1/donations/{id}/apply`
///
/// ```json
/// { "customer_id": "550e8400-e29b-41d4-a716-446655440000", "amount_cents": 4000 }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the recorded usage
/// - **Error (400)**: non-positive amount or deactivated customer
/// - **Error (404)**: unknown donation or customer
/// - **Error (422)**: amount exceeds what is left of the donation
pub async fn apply_donation(
    State(pool): State<DbPool>,
    Path(donation_id): Path<Uuid>,
    Json(request): Json<ApplyDonationRequest>,
) -> Result<(StatusCode, Json<DonationUsage>), AppError> {
    let usage = donation_service::apply_donation(&pool, donation_id, request).await?;
    Ok((StatusCode::CREATED, Json(usage)))
}
