//! Product catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, validation};

/// Represents a product record from the `products` table.
///
/// Debt line items copy `name` and `price_cents` at entry time, so later
/// catalog edits never rewrite history.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,

    /// Unit price in cents (>= 0)
    pub price_cents: i64,

    pub category: Option<String>,
    pub is_prescription: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating or replacing a product.
///
/// ```json
/// {
///   "name": "Paracetamol 500mg",
///   "price_cents": 450,
///   "category": "Pain Relief",
///   "is_prescription": false
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price_cents: i64,
    pub category: Option<String>,
    #[serde(default)]
    pub is_prescription: bool,
}

impl ProductRequest {
    /// Normalize text fields and check the price.
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            name: validation::required_text(&self.name, "Product name", 200)?,
            price_cents: validation::non_negative_amount(self.price_cents, "Price")?,
            category: validation::optional_text(self.category.as_deref(), "Category", 100)?,
            is_prescription: self.is_prescription,
        })
    }
}
