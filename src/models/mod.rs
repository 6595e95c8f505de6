//! Data models representing database entities and request bodies.
//!
//! This module contains all data structures that map to database tables,
//! plus the derived views computed from them.

/// Audit trail rows
pub mod audit;
/// Derived balance, aging and credit views
pub mod balance;
/// Customer registry
pub mod customer;
/// Donations and their usages
pub mod donation;
/// Append-only ledger entries and line items
pub mod ledger;
/// Product catalog
pub mod product;
/// Cross-customer report views
pub mod report;
