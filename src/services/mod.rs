//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and the balance fold.

pub mod audit;
pub mod balance_engine;
pub mod customer_service;
pub mod donation_service;
pub mod ledger_service;
pub mod product_service;
pub mod report_service;
pub mod seed;
