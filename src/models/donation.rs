//! Donation models.
//!
//! Donations are recorded once and exhausted by usages; neither is ever
//! deleted. A usage reduces the balance of the customer it was applied to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, validation};

/// Represents a row of the `donations` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Donation {
    pub id: Uuid,
    pub amount_cents: i64,
    pub donor_name: Option<String>,

    /// Where the money came from
    pub source_note: Option<String>,

    pub donated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Donation with how much of it has been applied so far.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DonationBalance {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub donation: Donation,
    pub used_cents: i64,
    pub remaining_cents: i64,
}

/// Represents a row of the `donation_usages` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DonationUsage {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub customer_id: Uuid,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub applied_at: DateTime<Utc>,
}

/// Usage joined with customer and donor names for the history view.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DonationUsageRecord {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub usage: DonationUsage,
    pub customer_name: String,
    pub donor_name: Option<String>,
    pub donation_amount_cents: i64,
}

/// Totals across all donations.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DonationTotals {
    pub donated_cents: i64,
    pub used_cents: i64,
    pub available_cents: i64,
}

/// Request body for recording a donation.
///
/// ```json
/// { "amount_cents": 10000, "donor_name": "Local Rotary Club", "source_note": "Annual drive" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RecordDonationRequest {
    pub amount_cents: i64,
    pub donor_name: Option<String>,
    pub source_note: Option<String>,
    pub donated_at: Option<DateTime<Utc>>,
}

impl RecordDonationRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            amount_cents: validation::positive_amount(self.amount_cents, "Donation amount")?,
            donor_name: validation::optional_text(self.donor_name.as_deref(), "Donor name", 200)?,
            source_note: validation::optional_text(self.source_note.as_deref(), "Source note", 500)?,
            donated_at: self.donated_at,
        })
    }
}

/// Request body for applying part of a donation to a customer.
///
/// ```json
/// { "customer_id": "550e8400-e29b-41d4-a716-446655440000", "amount_cents": 4000 }
/// ```
#[derive(Debug, Deserialize)]
pub struct ApplyDonationRequest {
    pub customer_id: Uuid,
    pub amount_cents: i64,
    pub note: Option<String>,
}

/// Check a usage against what is left of a donation.
///
/// Returns the remainder after the usage.
///
/// # Errors
///
/// - `Validation` if the requested amount is not positive
/// - `OverApplication` if it exceeds the unused remainder
pub fn check_application(
    donation_amount_cents: i64,
    used_cents: i64,
    requested_cents: i64,
) -> Result<i64, AppError> {
    validation::positive_amount(requested_cents, "Usage amount")?;

    let remaining_cents = donation_amount_cents - used_cents;
    if requested_cents > remaining_cents {
        return Err(AppError::OverApplication {
            requested_cents,
            remaining_cents,
        });
    }
    Ok(remaining_cents - requested_cents)
}
