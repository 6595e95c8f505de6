//! Ledger data models and API request types.
//!
//! This module defines:
//! - `LedgerEntry` / `LedgerItem`: immutable rows of the customer ledger
//! - `AppendEntryRequest`: request body for appending an entry
//! - `NewEntry` / `ResolvedItem`: validated forms used by the ledger service
//!
//! # Direction
//!
//! Amounts are stored as positive cents for every kind except
//! `Adjustment`, which is signed. The kind decides how an entry moves the
//! balance (see [`EntryKind::balance_effect`]).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

use crate::{error::AppError, validation};

/// Kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// New debt, usually itemized
    Debt,
    /// Money received from the customer
    Payment,
    /// Signed correction of an earlier entry
    Adjustment,
    /// Uncollectible debt retired
    WriteOff,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Debt => "debt",
            EntryKind::Payment => "payment",
            EntryKind::Adjustment => "adjustment",
            EntryKind::WriteOff => "write_off",
        }
    }

    /// Signed effect of an entry of this kind on the customer balance.
    pub fn balance_effect(&self, amount_cents: i64) -> i64 {
        match self {
            EntryKind::Debt | EntryKind::Adjustment => amount_cents,
            EntryKind::Payment | EntryKind::WriteOff => -amount_cents,
        }
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Check,
    Credit,
    Split,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Check => "check",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Split => "split",
        }
    }
}

/// A stored enum column held a value this build does not know.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl FromStr for EntryKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debt" => Ok(EntryKind::Debt),
            "payment" => Ok(EntryKind::Payment),
            "adjustment" => Ok(EntryKind::Adjustment),
            "write_off" => Ok(EntryKind::WriteOff),
            other => Err(UnknownVariant {
                kind: "entry kind",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "check" => Ok(PaymentMethod::Check),
            "credit" => Ok(PaymentMethod::Credit),
            "split" => Ok(PaymentMethod::Split),
            other => Err(UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a ledger entry from the `ledger_entries` table.
///
/// Entries are never updated or deleted once written; a trigger in the
/// schema rejects both.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: EntryKind,

    /// Amount in cents; positive except for adjustments
    pub amount_cents: i64,

    /// Present exactly when `kind` is `Payment`
    pub payment_method: Option<PaymentMethod>,

    pub rx_number: Option<String>,
    pub note: Option<String>,

    /// Earlier entry of the same customer that this one compensates
    pub reference_id: Option<Uuid>,

    /// Business timestamp; ledger order is (`occurred_at`, `id`)
    pub occurred_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn balance_effect(&self) -> i64 {
        self.kind.balance_effect(self.amount_cents)
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for LedgerEntry {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        let payment_method: Option<String> = row.try_get("payment_method")?;

        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            kind: kind.parse().map_err(|e| column_error("kind", e))?,
            amount_cents: row.try_get("amount_cents")?,
            payment_method: payment_method
                .map(|m| m.parse())
                .transpose()
                .map_err(|e| column_error("payment_method", e))?,
            rx_number: row.try_get("rx_number")?,
            note: row.try_get("note")?,
            reference_id: row.try_get("reference_id")?,
            occurred_at: row.try_get("occurred_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn column_error(column: &str, source: UnknownVariant) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

/// Line item of a debt entry, from the `ledger_items` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LedgerItem {
    pub id: Uuid,
    pub entry_id: Uuid,

    /// Catalog product the name and price were copied from, if any
    pub product_id: Option<Uuid>,

    pub product_name: String,
    pub price_cents: i64,
    pub quantity: i32,
    pub rx_number: Option<String>,
}

/// Entry together with its line items, as returned by history endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryWithItems {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub items: Vec<LedgerItem>,
}

/// One requested line item.
///
/// Either `product_id` (name and price come from the catalog) or a custom
/// `name` with `price_cents`, never both.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLedgerItem {
    pub product_id: Option<Uuid>,
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub quantity: Option<i32>,
    pub rx_number: Option<String>,
}

/// Where a validated item takes its name and price from.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSource {
    Product(Uuid),
    Custom { name: String, price_cents: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedItem {
    pub source: ItemSource,
    pub quantity: i32,
    pub rx_number: Option<String>,
}

/// Item with name and price fixed, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub price_cents: i64,
    pub quantity: i32,
    pub rx_number: Option<String>,
}

impl ResolvedItem {
    pub fn line_total(&self) -> Option<i64> {
        self.price_cents.checked_mul(i64::from(self.quantity))
    }
}

/// Request body for appending a ledger entry.
///
/// # JSON Example
///
/// ```json
/// {
///   "kind": "debt",
///   "amount_cents": 1350,
///   "items": [
///     { "product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 2 },
///     { "name": "Cough Syrup", "price_cents": 450 }
///   ]
/// }
/// ```
///
/// ```json
/// { "kind": "payment", "amount_cents": 500, "payment_method": "cash" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AppendEntryRequest {
    pub kind: EntryKind,
    pub amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub rx_number: Option<String>,
    pub reference_id: Option<Uuid>,

    /// Defaults to the time of the request
    pub occurred_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub items: Vec<NewLedgerItem>,
}

/// Structurally valid entry; catalog lookups and balance checks remain.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub rx_number: Option<String>,
    pub reference_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub items: Vec<ValidatedItem>,
}

impl AppendEntryRequest {
    /// Check everything that does not need the database.
    ///
    /// # Errors
    ///
    /// `AppError::Validation` when:
    /// - a debt, payment or write-off amount is not positive, or an adjustment is zero
    /// - a debt has no items, or a non-debt has items
    /// - a payment has no method, or a non-payment has one
    /// - an adjustment or write-off has no note
    /// - an item mixes or omits product and custom fields
    pub fn validate(self) -> Result<NewEntry, AppError> {
        let amount_cents = match self.kind {
            EntryKind::Adjustment => {
                if self.amount_cents == 0 {
                    return Err(AppError::validation("Adjustment amount cannot be zero"));
                }
                if self.amount_cents.abs() > validation::MAX_AMOUNT_CENTS {
                    return Err(AppError::validation(
                        "Adjustment amount exceeds maximum allowed value",
                    ));
                }
                self.amount_cents
            }
            _ => validation::positive_amount(self.amount_cents, "Amount")?,
        };

        match (self.kind, self.payment_method) {
            (EntryKind::Payment, None) => {
                return Err(AppError::validation("Payment method is required"));
            }
            (kind, Some(_)) if kind != EntryKind::Payment => {
                return Err(AppError::validation(
                    "Payment method is only allowed on payments",
                ));
            }
            _ => {}
        }

        let note = validation::optional_text(self.note.as_deref(), "Note", 500)?;
        if matches!(self.kind, EntryKind::Adjustment | EntryKind::WriteOff) && note.is_none() {
            return Err(AppError::validation(format!(
                "A reason note is required for {}",
                self.kind
            )));
        }

        let items = if self.kind == EntryKind::Debt {
            if self.items.is_empty() {
                return Err(AppError::validation("At least one item is required"));
            }
            self.items
                .into_iter()
                .enumerate()
                .map(|(i, item)| item.validate(i + 1))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            if !self.items.is_empty() {
                return Err(AppError::validation("Only debts can carry items"));
            }
            Vec::new()
        };

        Ok(NewEntry {
            kind: self.kind,
            amount_cents,
            payment_method: self.payment_method,
            note,
            rx_number: validation::optional_text(self.rx_number.as_deref(), "Rx number", 50)?,
            reference_id: self.reference_id,
            occurred_at: self.occurred_at,
            items,
        })
    }
}

impl NewLedgerItem {
    fn validate(self, position: usize) -> Result<ValidatedItem, AppError> {
        let quantity = validation::quantity(
            self.quantity.unwrap_or(1),
            &format!("Quantity (item {position})"),
        )?;
        let rx_number = validation::optional_text(
            self.rx_number.as_deref(),
            &format!("Rx number (item {position})"),
            50,
        )?;
        let custom_name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

        let source = match (self.product_id, custom_name, self.price_cents) {
            (Some(product_id), None, None) => ItemSource::Product(product_id),
            (Some(_), _, _) => {
                return Err(AppError::validation(format!(
                    "Item {position} must be either a catalog product or a custom entry, not both"
                )));
            }
            (None, Some(name), Some(price_cents)) => ItemSource::Custom {
                name: validation::required_text(name, &format!("Product name (item {position})"), 200)?,
                price_cents: validation::non_negative_amount(
                    price_cents,
                    &format!("Price (item {position})"),
                )?,
            },
            (None, None, _) => {
                return Err(AppError::validation(format!(
                    "Product name (item {position}) is required"
                )));
            }
            (None, Some(_), None) => {
                return Err(AppError::validation(format!(
                    "Price (item {position}) is required"
                )));
            }
        };

        Ok(ValidatedItem {
            source,
            quantity,
            rx_number,
        })
    }
}

/// Sum of price × quantity over the items.
pub fn items_total(items: &[ResolvedItem]) -> Result<i64, AppError> {
    items.iter().try_fold(0i64, |total, item| {
        item.line_total()
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| AppError::validation("Item total is too large"))
    })
}

/// A debt's amount must equal its item total; mismatches are rejected, not corrected.
pub fn check_debt_total(amount_cents: i64, items: &[ResolvedItem]) -> Result<(), AppError> {
    let total = items_total(items)?;
    if total != amount_cents {
        return Err(AppError::validation(format!(
            "Debt amount ({amount_cents} cents) does not match item total ({total} cents)"
        )));
    }
    Ok(())
}

/// Query parameters for history reads.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        let (start, end) = validation::date_range(start, end)?;
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Half-open timestamp bounds `[start 00:00, end+1 00:00)`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = self
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();
        (start, end)
    }
}

impl HistoryQuery {
    /// Both ends are optional; an open end extends to the widest range
    /// the database stores comfortably.
    pub fn range(&self) -> Result<Option<DateRange>, AppError> {
        match (self.start, self.end) {
            (None, None) => Ok(None),
            (start, end) => DateRange::new(
                start.unwrap_or_else(earliest_day),
                end.unwrap_or_else(latest_day),
            )
            .map(Some),
        }
    }
}

fn earliest_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn latest_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(name: &str, price: i64, quantity: i32) -> NewLedgerItem {
        NewLedgerItem {
            product_id: None,
            name: Some(name.to_string()),
            price_cents: Some(price),
            quantity: Some(quantity),
            rx_number: None,
        }
    }

    fn debt(items: Vec<NewLedgerItem>, amount: i64) -> AppendEntryRequest {
        AppendEntryRequest {
            kind: EntryKind::Debt,
            amount_cents: amount,
            payment_method: None,
            note: None,
            rx_number: None,
            reference_id: None,
            occurred_at: None,
            items,
        }
    }

    fn resolved(price: i64, quantity: i32) -> ResolvedItem {
        ResolvedItem {
            product_id: None,
            product_name: "Item".to_string(),
            price_cents: price,
            quantity,
            rx_number: None,
        }
    }

    #[test]
    fn balance_effect_follows_kind() {
        assert_eq!(EntryKind::Debt.balance_effect(500), 500);
        assert_eq!(EntryKind::Payment.balance_effect(500), -500);
        assert_eq!(EntryKind::WriteOff.balance_effect(500), -500);
        assert_eq!(EntryKind::Adjustment.balance_effect(-200), -200);
    }

    #[test]
    fn enum_text_round_trips_through_column_values() {
        for kind in [
            EntryKind::Debt,
            EntryKind::Payment,
            EntryKind::Adjustment,
            EntryKind::WriteOff,
        ] {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
        assert_eq!("split".parse::<PaymentMethod>().unwrap(), PaymentMethod::Split);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn debt_requires_items() {
        let err = debt(Vec::new(), 100).validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "At least one item is required"));
    }

    #[test]
    fn payment_requires_method() {
        let request = AppendEntryRequest {
            kind: EntryKind::Payment,
            amount_cents: 100,
            payment_method: None,
            note: None,
            rx_number: None,
            reference_id: None,
            occurred_at: None,
            items: Vec::new(),
        };
        assert!(request.clone().validate().is_err());

        let with_method = AppendEntryRequest {
            payment_method: Some(PaymentMethod::Card),
            ..request
        };
        assert_eq!(
            with_method.validate().unwrap().payment_method,
            Some(PaymentMethod::Card)
        );
    }

    #[test]
    fn method_on_a_debt_is_rejected() {
        let mut request = debt(vec![custom("Gauze", 100, 1)], 100);
        request.payment_method = Some(PaymentMethod::Cash);
        assert!(request.validate().is_err());
    }

    #[test]
    fn adjustments_are_signed_and_need_a_reason() {
        let request = AppendEntryRequest {
            kind: EntryKind::Adjustment,
            amount_cents: -250,
            payment_method: None,
            note: None,
            rx_number: None,
            reference_id: None,
            occurred_at: None,
            items: Vec::new(),
        };
        assert!(request.clone().validate().is_err());

        let with_note = AppendEntryRequest {
            note: Some("Price correction".to_string()),
            ..request
        };
        assert_eq!(with_note.validate().unwrap().amount_cents, -250);
    }

    #[test]
    fn item_cannot_be_both_product_and_custom() {
        let item = NewLedgerItem {
            product_id: Some(Uuid::new_v4()),
            name: Some("Aspirin".to_string()),
            price_cents: None,
            quantity: None,
            rx_number: None,
        };
        assert!(debt(vec![item], 100).validate().is_err());
    }

    #[test]
    fn custom_item_needs_a_price() {
        let item = NewLedgerItem {
            product_id: None,
            name: Some("Aspirin".to_string()),
            price_cents: None,
            quantity: None,
            rx_number: None,
        };
        assert!(debt(vec![item], 100).validate().is_err());
    }

    #[test]
    fn quantity_defaults_to_one() {
        let item = NewLedgerItem {
            quantity: None,
            ..custom("Gauze", 100, 1)
        };
        let entry = debt(vec![item], 100).validate().unwrap();
        assert_eq!(entry.items[0].quantity, 1);
    }

    #[test]
    fn debt_total_must_match_items() {
        let items = vec![resolved(450, 2), resolved(300, 1)];
        assert!(check_debt_total(1200, &items).is_ok());

        let err = check_debt_total(1000, &items).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("1200")));
    }

    #[test]
    fn date_range_bounds_cover_whole_days() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let (start, end) = DateRange::single_day(day).bounds();
        assert_eq!(start.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-06-02T00:00:00+00:00");
    }

    #[test]
    fn history_query_rejects_reversed_range() {
        let query = HistoryQuery {
            start: NaiveDate::from_ymd_opt(2025, 6, 2),
            end: NaiveDate::from_ymd_opt(2025, 6, 1),
        };
        assert!(query.range().is_err());
        assert!(HistoryQuery::default().range().unwrap().is_none());
    }
}
