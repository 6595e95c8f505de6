//! View-models behind the customer list and the debt entry form.
//!
//! Pure state with no I/O; handlers feed them data and serialize the result.

pub mod customer_filter;
pub mod debt_form;
