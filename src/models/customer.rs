//! Customer data models and API request types.
//!
//! This module defines:
//! - `Customer`: Database entity representing a pharmacy customer
//! - `CreateCustomerRequest` / `UpdateCustomerRequest`: Request bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, validation};

/// Represents a customer record from the database.
///
/// # Database Table
///
/// Maps to the `customers` table. Customers are never hard-deleted:
/// deactivation keeps their ledger history intact.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,

    /// Maximum balance the customer may carry, in cents (>= 0).
    pub credit_limit_cents: i64,

    /// Days a new debt may stay unpaid before follow-up.
    pub grace_period_days: i32,

    /// Inactive customers keep their history but accept no new entries.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

/// Request body for creating a new customer.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "John Doe",
///   "phone": "5551234",
///   "credit_limit_cents": 50000
/// }
/// ```
///
/// Credit limit and grace period fall back to the configured defaults.
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub credit_limit_cents: Option<i64>,
    pub grace_period_days: Option<i32>,
}

/// Request body for replacing a customer's profile.
#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub credit_limit_cents: i64,
    pub grace_period_days: i32,
}

/// Validated, normalized customer profile ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfile {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub credit_limit_cents: i64,
    pub grace_period_days: i32,
}

impl CustomerProfile {
    fn build(
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: Option<&str>,
        notes: Option<&str>,
        credit_limit_cents: i64,
        grace_period_days: i32,
    ) -> Result<Self, AppError> {
        if grace_period_days < 0 {
            return Err(AppError::validation("Grace period cannot be negative"));
        }

        Ok(Self {
            name: validation::required_text(name, "Name", 200)?,
            phone: validation::optional_text(phone, "Phone", 50)?,
            email: validation::optional_text(email, "Email", 200)?,
            address: validation::optional_text(address, "Address", 500)?,
            notes: validation::optional_text(notes, "Notes", 500)?,
            credit_limit_cents: validation::non_negative_amount(credit_limit_cents, "Credit limit")?,
            grace_period_days,
        })
    }
}

impl CreateCustomerRequest {
    /// Validate the request, filling unset limits from the given defaults.
    pub fn into_profile(
        self,
        default_credit_limit_cents: i64,
        default_grace_period_days: i32,
    ) -> Result<CustomerProfile, AppError> {
        CustomerProfile::build(
            &self.name,
            self.phone.as_deref(),
            self.email.as_deref(),
            self.address.as_deref(),
            self.notes.as_deref(),
            self.credit_limit_cents.unwrap_or(default_credit_limit_cents),
            self.grace_period_days.unwrap_or(default_grace_period_days),
        )
    }
}

impl UpdateCustomerRequest {
    pub fn into_profile(self) -> Result<CustomerProfile, AppError> {
        CustomerProfile::build(
            &self.name,
            self.phone.as_deref(),
            self.email.as_deref(),
            self.address.as_deref(),
            self.notes.as_deref(),
            self.credit_limit_cents,
            self.grace_period_days,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCustomerRequest {
        CreateCustomerRequest {
            name: " John Doe ".to_string(),
            phone: Some("5551234".to_string()),
            email: Some("".to_string()),
            address: None,
            notes: None,
            credit_limit_cents: None,
            grace_period_days: None,
        }
    }

    #[test]
    fn defaults_fill_unset_limits() {
        let profile = request().into_profile(50_000, 7).unwrap();
        assert_eq!(profile.name, "John Doe");
        assert_eq!(profile.email, None);
        assert_eq!(profile.credit_limit_cents, 50_000);
        assert_eq!(profile.grace_period_days, 7);
    }

    #[test]
    fn negative_credit_limit_is_rejected() {
        let mut req = request();
        req.credit_limit_cents = Some(-1);
        assert!(matches!(
            req.into_profile(50_000, 7),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut req = request();
        req.name = "   ".to_string();
        assert!(req.into_profile(50_000, 7).is_err());
    }
}
