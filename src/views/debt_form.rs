//! Multi-row debt entry form.
//!
//! Each row is a small state machine: a catalog product and a custom name
//! are mutually exclusive, and choosing one clears the other.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        ledger::{AppendEntryRequest, EntryKind, NewLedgerItem},
        product::Product,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemRow {
    #[default]
    Empty,
    /// Name and price come from the catalog and are not editable
    ProductSelected {
        product_id: Uuid,
        name: String,
        price_cents: i64,
    },
    /// Free-text item; the price is typed by hand
    CustomTyped {
        name: String,
        price_cents: Option<i64>,
    },
}

impl ItemRow {
    /// Pick a catalog product, discarding any custom entry.
    pub fn select_product(&mut self, product: &Product) {
        *self = ItemRow::ProductSelected {
            product_id: product.id,
            name: product.name.clone(),
            price_cents: product.price_cents,
        };
    }

    /// Type a custom name, discarding any selected product. A blank name
    /// empties the row.
    pub fn type_custom_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            *self = ItemRow::Empty;
            return;
        }

        let price_cents = match self {
            ItemRow::CustomTyped { price_cents, .. } => *price_cents,
            _ => None,
        };
        *self = ItemRow::CustomTyped {
            name: name.to_string(),
            price_cents,
        };
    }

    /// Set the manual price. Ignored unless the row holds a custom entry.
    pub fn set_custom_price(&mut self, price: Option<i64>) {
        if let ItemRow::CustomTyped { price_cents, .. } = self {
            *price_cents = price;
        }
    }

    pub fn clear(&mut self) {
        *self = ItemRow::Empty;
    }

    /// Name and unit price, when both are known.
    pub fn resolved(&self) -> Option<(&str, i64)> {
        match self {
            ItemRow::Empty => None,
            ItemRow::ProductSelected {
                name, price_cents, ..
            } => Some((name.as_str(), *price_cents)),
            ItemRow::CustomTyped {
                name,
                price_cents: Some(price),
            } => Some((name.as_str(), *price)),
            ItemRow::CustomTyped {
                price_cents: None, ..
            } => None,
        }
    }
}

/// A row with its quantity and optional prescription number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRow {
    pub item: ItemRow,
    pub quantity: i32,
    pub rx_number: Option<String>,
}

impl Default for FormRow {
    fn default() -> Self {
        Self {
            item: ItemRow::Empty,
            quantity: 1,
            rx_number: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DebtForm {
    rows: Vec<FormRow>,
}

impl DebtForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(FormRow::default());
        self.rows.len() - 1
    }

    pub fn remove_row(&mut self, index: usize) -> Option<FormRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut FormRow> {
        self.rows.get_mut(index)
    }

    pub fn rows(&self) -> &[FormRow] {
        &self.rows
    }

    /// At least one row has both a name and a price.
    pub fn can_submit(&self) -> bool {
        self.rows.iter().any(|row| row.item.resolved().is_some())
    }

    /// Sum of price × quantity over resolved rows.
    pub fn total_cents(&self) -> Option<i64> {
        self.rows
            .iter()
            .filter_map(|row| row.item.resolved().map(|(_, price)| (price, row.quantity)))
            .try_fold(0i64, |total, (price, quantity)| {
                price
                    .checked_mul(i64::from(quantity))
                    .and_then(|line| total.checked_add(line))
            })
    }

    /// Turn the form into a debt entry request. Incomplete rows are skipped.
    ///
    /// # Errors
    ///
    /// - `Validation` if no row is complete
    pub fn submit(
        &self,
        note: Option<String>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<AppendEntryRequest, AppError> {
        if !self.can_submit() {
            return Err(AppError::validation(
                "Please add at least one product with a name and price",
            ));
        }
        let amount_cents = self
            .total_cents()
            .ok_or_else(|| AppError::validation("Item total is too large"))?;

        let items = self
            .rows
            .iter()
            .filter_map(|row| {
                let item = match &row.item {
                    ItemRow::ProductSelected { product_id, .. } => NewLedgerItem {
                        product_id: Some(*product_id),
                        name: None,
                        price_cents: None,
                        quantity: Some(row.quantity),
                        rx_number: row.rx_number.clone(),
                    },
                    ItemRow::CustomTyped {
                        name,
                        price_cents: Some(price),
                    } => NewLedgerItem {
                        product_id: None,
                        name: Some(name.clone()),
                        price_cents: Some(*price),
                        quantity: Some(row.quantity),
                        rx_number: row.rx_number.clone(),
                    },
                    _ => return None,
                };
                Some(item)
            })
            .collect();

        Ok(AppendEntryRequest {
            kind: EntryKind::Debt,
            amount_cents,
            payment_method: None,
            note,
            rx_number: None,
            reference_id: None,
            occurred_at,
            items,
        })
    }
}

/// One submitted form row.
///
/// A non-blank `custom_name` replaces a selected product, matching what
/// typing into the custom field does on the page.
#[derive(Debug, Clone, Deserialize)]
pub struct FormRowInput {
    pub product_id: Option<Uuid>,
    pub custom_name: Option<String>,
    pub price_cents: Option<i64>,
    pub quantity: Option<i32>,
    pub rx_number: Option<String>,
}

/// Request body of `POST /customers/{id}/debts`.
///
/// ```json
/// {
///   "rows": [
///     { "product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 2 },
///     { "custom_name": "Cough Syrup", "price_cents": 450 },
///     { }
///   ],
///   "note": "Weekly refill"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DebtFormRequest {
    #[serde(default)]
    pub rows: Vec<FormRowInput>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl DebtFormRequest {
    /// Catalog products the rows refer to, in row order.
    pub fn product_ids(&self) -> Vec<Uuid> {
        self.rows.iter().filter_map(|row| row.product_id).collect()
    }

    /// Replay the submitted rows through the form state machine.
    ///
    /// `lookup` yields the catalog product for an id.
    pub fn into_form<'p>(
        self,
        lookup: impl Fn(Uuid) -> Option<&'p Product>,
    ) -> Result<(DebtForm, Option<String>, Option<DateTime<Utc>>), AppError> {
        let mut form = DebtForm::new();
        for input in self.rows {
            let index = form.add_row();
            let Some(row) = form.row_mut(index) else {
                continue;
            };

            if let Some(product_id) = input.product_id {
                let product = lookup(product_id).ok_or(AppError::NotFound("Product"))?;
                row.item.select_product(product);
            }
            if let Some(name) = input.custom_name.as_deref().filter(|n| !n.trim().is_empty()) {
                row.item.type_custom_name(name);
                row.item.set_custom_price(input.price_cents);
            }
            if let Some(quantity) = input.quantity {
                row.quantity = quantity;
            }
            row.rx_number = input.rx_number;
        }
        Ok((form, self.note, self.occurred_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price_cents: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price_cents,
            category: None,
            is_prescription: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn selecting_a_product_clears_the_custom_entry() {
        let aspirin = product("Aspirin", 500);
        let mut row = ItemRow::Empty;

        row.type_custom_name("Home remedy");
        row.set_custom_price(Some(300));
        row.select_product(&aspirin);

        assert_eq!(row.resolved(), Some(("Aspirin", 500)));
        assert!(matches!(row, ItemRow::ProductSelected { .. }));
    }

    #[test]
    fn typing_a_custom_name_clears_the_product() {
        let mut row = ItemRow::Empty;
        row.select_product(&product("Aspirin", 500));
        row.type_custom_name("Bandage");

        assert_eq!(
            row,
            ItemRow::CustomTyped {
                name: "Bandage".to_string(),
                price_cents: None
            }
        );
        assert_eq!(row.resolved(), None);
    }

    #[test]
    fn price_only_applies_to_custom_rows() {
        let mut row = ItemRow::Empty;
        row.set_custom_price(Some(100));
        assert_eq!(row, ItemRow::Empty);

        row.select_product(&product("Aspirin", 500));
        row.set_custom_price(Some(100));
        assert_eq!(row.resolved(), Some(("Aspirin", 500)));
    }

    #[test]
    fn editing_the_custom_name_keeps_the_typed_price() {
        let mut row = ItemRow::Empty;
        row.type_custom_name("Bandge");
        row.set_custom_price(Some(250));
        row.type_custom_name("Bandage");
        assert_eq!(row.resolved(), Some(("Bandage", 250)));

        row.type_custom_name("  ");
        assert_eq!(row, ItemRow::Empty);
    }

    #[test]
    fn clearing_a_row_empties_it_from_any_state() {
        let mut row = ItemRow::Empty;
        row.select_product(&product("Aspirin", 500));
        row.clear();
        assert_eq!(row, ItemRow::Empty);
        assert_eq!(row.resolved(), None);

        row.type_custom_name("Gauze");
        row.set_custom_price(Some(120));
        row.clear();
        assert_eq!(row, ItemRow::Empty);

        // A cleared row accepts a manual price only after a new name
        row.set_custom_price(Some(300));
        assert_eq!(row, ItemRow::Empty);
    }

    #[test]
    fn removing_the_only_complete_row_blocks_submission() {
        let mut form = DebtForm::new();
        let aspirin = form.add_row();
        form.add_row();
        if let Some(row) = form.row_mut(aspirin) {
            row.item.select_product(&product("Aspirin", 450));
        }
        assert!(form.can_submit());

        assert!(form.remove_row(7).is_none());
        assert_eq!(form.rows().len(), 2);

        let removed = form.remove_row(aspirin).unwrap();
        assert_eq!(removed.item.resolved(), Some(("Aspirin", 450)));
        assert_eq!(form.rows().len(), 1);
        assert_eq!(form.rows()[0].item, ItemRow::Empty);

        assert!(!form.can_submit());
        assert_eq!(form.total_cents(), Some(0));
        assert!(matches!(form.submit(None, None), Err(AppError::Validation(_))));
    }

    #[test]
    fn submit_requires_one_complete_row() {
        let mut form = DebtForm::new();
        form.add_row();
        let custom = form.add_row();
        if let Some(row) = form.row_mut(custom) {
            row.item.type_custom_name("Gauze");
        }
        assert!(!form.can_submit());
        assert!(matches!(form.submit(None, None), Err(AppError::Validation(_))));

        if let Some(row) = form.row_mut(custom) {
            row.item.set_custom_price(Some(120));
            row.quantity = 3;
        }
        assert!(form.can_submit());

        let request = form.submit(None, None).unwrap();
        assert_eq!(request.amount_cents, 360);
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].name.as_deref(), Some("Gauze"));
    }

    #[test]
    fn submitted_rows_replay_through_the_state_machine() {
        let aspirin = product("Aspirin", 450);
        let catalog = [aspirin.clone()];
        let request = DebtFormRequest {
            rows: vec![
                FormRowInput {
                    product_id: Some(aspirin.id),
                    custom_name: None,
                    price_cents: None,
                    quantity: Some(2),
                    rx_number: Some("RX-1".to_string()),
                },
                FormRowInput {
                    product_id: None,
                    custom_name: Some("Cough Syrup".to_string()),
                    price_cents: Some(300),
                    quantity: None,
                    rx_number: None,
                },
                FormRowInput {
                    product_id: None,
                    custom_name: None,
                    price_cents: Some(999),
                    quantity: None,
                    rx_number: None,
                },
            ],
            note: Some("Weekly refill".to_string()),
            occurred_at: None,
        };

        let (form, note, _) = request
            .into_form(|id| catalog.iter().find(|p| p.id == id))
            .unwrap();
        let entry = form.submit(note, None).unwrap().validate().unwrap();

        assert_eq!(entry.amount_cents, 1_200);
        assert_eq!(entry.items.len(), 2);
        assert_eq!(entry.note.as_deref(), Some("Weekly refill"));
    }

    #[test]
    fn unknown_product_is_not_found() {
        let request = DebtFormRequest {
            rows: vec![FormRowInput {
                product_id: Some(Uuid::new_v4()),
                custom_name: None,
                price_cents: None,
                quantity: None,
                rx_number: None,
            }],
            note: None,
            occurred_at: None,
        };
        assert!(matches!(
            request.into_form(|_| None),
            Err(AppError::NotFound("Product"))
        ));
    }
}
