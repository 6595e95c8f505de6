//! Demo data for an empty database.
//!
//! The data set is planned up front from a random generator, then written
//! through the regular services so every ledger rule applies to it.

use chrono::{Duration, Utc};
use rand::{Rng, seq::IndexedRandom};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        customer::CustomerProfile,
        ledger::{EntryKind, ItemSource, NewEntry, PaymentMethod, ValidatedItem},
        product::ProductRequest,
    },
    services::{balance_engine, customer_service, ledger_service, product_service},
};

const FIRST_NAMES: &[&str] = &[
    "Ahmad", "Mohammad", "Ali", "Hassan", "Omar", "Khaled", "Tarek", "Fadi", "Rami", "Mariam",
    "Hala", "Layla", "Nour", "Sara", "Rania", "Lina", "Nadia", "Yara", "George", "Joseph",
    "Michel", "Pierre", "Antoine", "Marie", "Sophie", "Claire", "Julie", "Camille",
];

const LAST_NAMES: &[&str] = &[
    "Khoury", "Saad", "Fadel", "Ghandour", "Younes", "Mansour", "Ibrahim", "Salem", "Nasser",
    "Khalil", "Haddad", "Mouawad", "Rizk", "Tannous", "Chamoun", "Karam", "Moussa", "Daher",
    "Maalouf", "Sarkis", "Boutros", "Assaf",
];

const PRODUCTS: &[(&str, &str)] = &[
    ("Paracetamol 500mg", "Pain Relief"),
    ("Ibuprofen 400mg", "Pain Relief"),
    ("Amoxicillin 500mg", "Antibiotics"),
    ("Azithromycin 250mg", "Antibiotics"),
    ("Amlodipine 5mg", "Cardiovascular"),
    ("Atorvastatin 20mg", "Cardiovascular"),
    ("Metformin 500mg", "Diabetes"),
    ("Glucose Test Strips", "Diabetes"),
    ("Salbutamol Inhaler", "Respiratory"),
    ("Cough Syrup", "Respiratory"),
    ("Omeprazole 20mg", "Digestive"),
    ("Vitamin D3 1000IU", "Vitamins"),
    ("Multivitamin", "Vitamins"),
    ("Hydrocortisone Cream", "Skin Care"),
    ("Sertraline 50mg", "Mental Health"),
    ("Bandages", "Medical Supplies"),
    ("Gauze", "Medical Supplies"),
    ("Thermometer", "Medical Supplies"),
];

const DEBT_NOTES: &[&str] = &[
    "Monthly prescription",
    "Emergency purchase",
    "Regular refill",
    "Family medication",
];

const PAYMENT_METHODS: &[PaymentMethod] = &[
    PaymentMethod::Cash,
    PaymentMethod::Card,
    PaymentMethod::Check,
];

#[derive(Debug, Clone)]
pub struct PlannedDebt {
    pub days_ago: i64,
    /// (index into the product list, quantity)
    pub items: Vec<(usize, i32)>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlannedPayment {
    pub days_ago: i64,
    /// Share of the balance at that point, in percent
    pub percent: i64,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct PlannedCustomer {
    pub profile: CustomerProfile,
    pub debts: Vec<PlannedDebt>,
    pub payments: Vec<PlannedPayment>,
}

#[derive(Debug)]
pub struct SeedPlan {
    pub products: Vec<ProductRequest>,
    pub customers: Vec<PlannedCustomer>,
}

/// Build a random demo data set. Debts are ordered oldest first and every
/// payment falls after the customer's last debt.
pub fn plan<R: Rng + ?Sized>(rng: &mut R, customer_count: usize) -> SeedPlan {
    let products = PRODUCTS
        .iter()
        .map(|(name, category)| ProductRequest {
            name: name.to_string(),
            price_cents: rng.random_range(200..=15_000),
            category: Some(category.to_string()),
            is_prescription: rng.random_bool(0.3),
        })
        .collect();

    let customers = (0..customer_count)
        .map(|_| plan_customer(rng))
        .collect();

    SeedPlan {
        products,
        customers,
    }
}

fn plan_customer<R: Rng + ?Sized>(rng: &mut R) -> PlannedCustomer {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Demo");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Customer");
    let phone = format!("0{}{:06}", rng.random_range(1..=9), rng.random_range(0..1_000_000));

    let profile = CustomerProfile {
        name: format!("{first} {last}"),
        phone: Some(phone),
        email: rng
            .random_bool(0.5)
            .then(|| format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase())),
        address: None,
        notes: None,
        credit_limit_cents: rng.random_range(20..=200) * 1_000,
        grace_period_days: 7,
    };

    let mut debts: Vec<PlannedDebt> = (0..rng.random_range(0..=6))
        .map(|_| PlannedDebt {
            days_ago: rng.random_range(1..=180),
            items: (0..rng.random_range(1..=4))
                .map(|_| (rng.random_range(0..PRODUCTS.len()), rng.random_range(1..=3)))
                .collect(),
            note: rng
                .random_bool(0.3)
                .then(|| DEBT_NOTES.choose(rng).copied().unwrap_or_default().to_string()),
        })
        .collect();
    debts.sort_by(|a, b| b.days_ago.cmp(&a.days_ago));

    let latest_debt = debts.last().map(|d| d.days_ago).unwrap_or(0);
    let payments = if latest_debt > 0 && rng.random_bool(0.6) {
        let mut payments: Vec<PlannedPayment> = (0..rng.random_range(1..=3))
            .map(|_| PlannedPayment {
                days_ago: rng.random_range(0..latest_debt),
                percent: rng.random_range(10..=60),
                method: PAYMENT_METHODS
                    .choose(rng)
                    .copied()
                    .unwrap_or(PaymentMethod::Cash),
            })
            .collect();
        payments.sort_by(|a, b| b.days_ago.cmp(&a.days_ago));
        payments
    } else {
        Vec::new()
    };

    PlannedCustomer {
        profile,
        debts,
        payments,
    }
}

/// Seed demo data unless customers already exist.
pub async fn seed_demo_data(pool: &DbPool, customer_count: usize) -> Result<(), AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Database already has customers, skipping demo seed");
        return Ok(());
    }

    let plan = {
        let mut rng = rand::rng();
        plan(&mut rng, customer_count)
    };

    let mut products = Vec::with_capacity(plan.products.len());
    for request in plan.products {
        products.push(product_service::create_product(pool, request).await?);
    }

    let now = Utc::now();
    let mut entry_count = 0usize;
    for planned in plan.customers {
        let customer = customer_service::create_customer(pool, planned.profile).await?;

        for debt in planned.debts {
            let mut items = Vec::with_capacity(debt.items.len());
            let mut amount_cents = 0;
            for (index, quantity) in debt.items {
                let Some(product) = products.get(index) else {
                    continue;
                };
                amount_cents += product.price_cents * i64::from(quantity);
                items.push(ValidatedItem {
                    source: ItemSource::Product(product.id),
                    quantity,
                    rx_number: None,
                });
            }
            if items.is_empty() || amount_cents == 0 {
                continue;
            }

            let entry = NewEntry {
                kind: EntryKind::Debt,
                amount_cents,
                payment_method: None,
                note: debt.note,
                rx_number: None,
                reference_id: None,
                occurred_at: Some(now - Duration::days(debt.days_ago)),
                items,
            };
            ledger_service::append_validated(pool, customer.id, entry).await?;
            entry_count += 1;
        }

        for payment in planned.payments {
            let balance = balance_engine::customer_balance(pool, customer.id).await?;
            let amount_cents = balance * payment.percent / 100;
            if amount_cents <= 0 {
                continue;
            }

            let entry = NewEntry {
                kind: EntryKind::Payment,
                amount_cents,
                payment_method: Some(payment.method),
                note: None,
                rx_number: None,
                reference_id: None,
                occurred_at: Some(now - Duration::days(payment.days_ago)),
                items: Vec::new(),
            };
            ledger_service::append_validated(pool, customer.id, entry).await?;
            entry_count += 1;
        }
    }

    tracing::info!(
        products = products.len(),
        customers = customer_count,
        entries = entry_count,
        "Demo data seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_is_internally_consistent() {
        let mut rng = rand::rng();
        let plan = plan(&mut rng, 50);

        assert_eq!(plan.products.len(), PRODUCTS.len());
        assert!(plan.products.iter().all(|p| (200..=15_000).contains(&p.price_cents)));
        assert_eq!(plan.customers.len(), 50);

        for customer in &plan.customers {
            assert!(customer.profile.credit_limit_cents >= 20_000);
            assert!(
                customer
                    .debts
                    .windows(2)
                    .all(|pair| pair[0].days_ago >= pair[1].days_ago)
            );
            let latest_debt = customer.debts.last().map(|d| d.days_ago).unwrap_or(0);
            assert!(customer.payments.iter().all(|p| p.days_ago < latest_debt));
            assert!(
                customer
                    .debts
                    .iter()
                    .flat_map(|d| &d.items)
                    .all(|(index, quantity)| *index < PRODUCTS.len() && (1..=3).contains(quantity))
            );
        }
    }
}
