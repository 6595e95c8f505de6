//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Validates what it can before touching the database
//! 3. Calls into a service and returns JSON with a status code

/// Customer registry endpoints
pub mod customers;
/// Donation ledger endpoints
pub mod donations;
/// Health check endpoint
pub mod health;
/// Per-customer ledger, balance and aging endpoints
pub mod ledger;
/// Product catalog endpoints
pub mod products;
/// Report and audit endpoints
pub mod reports;
