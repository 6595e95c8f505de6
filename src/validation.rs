//! Input validation shared by request types.
//!
//! Every check returns `AppError::Validation` with a message naming the
//! offending field, so handlers can surface it to the user as-is.

use chrono::NaiveDate;

use crate::error::AppError;

/// Largest single amount accepted anywhere: $1,000,000.00.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;

/// Largest quantity accepted on a line item.
pub const MAX_QUANTITY: i32 = 10_000;

/// Trim a required text field and enforce its length.
pub fn required_text(value: &str, field: &str, max_len: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} must not exceed {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank input becomes `None`.
pub fn optional_text(
    value: Option<&str>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(text, field, max_len).map(Some),
    }
}

/// Amount must be strictly positive and within the global maximum.
pub fn positive_amount(cents: i64, field: &str) -> Result<i64, AppError> {
    if cents <= 0 {
        return Err(AppError::validation(format!("{field} must be positive")));
    }
    within_max(cents, field)
}

/// Amount must be zero or more and within the global maximum.
pub fn non_negative_amount(cents: i64, field: &str) -> Result<i64, AppError> {
    if cents < 0 {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    within_max(cents, field)
}

fn within_max(cents: i64, field: &str) -> Result<i64, AppError> {
    if cents.abs() > MAX_AMOUNT_CENTS {
        return Err(AppError::validation(format!(
            "{field} exceeds maximum allowed value of {MAX_AMOUNT_CENTS} cents"
        )));
    }
    Ok(cents)
}

pub fn quantity(value: i32, field: &str) -> Result<i32, AppError> {
    if value <= 0 {
        return Err(AppError::validation(format!(
            "{field} must be greater than zero"
        )));
    }
    if value > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "{field} exceeds maximum allowed value of {MAX_QUANTITY}"
        )));
    }
    Ok(value)
}

/// Inclusive calendar date range; `start` may equal `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
    if start > end {
        return Err(AppError::validation(
            "Start date must be before or equal to end date",
        ));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("  Aspirin ", "Name", 10).unwrap(), "Aspirin");
        assert!(matches!(
            required_text("   ", "Name", 10),
            Err(AppError::Validation(msg)) if msg == "Name is required"
        ));
        assert!(required_text("abcdefghijk", "Name", 10).is_err());
    }

    #[test]
    fn optional_text_maps_blank_to_none() {
        assert_eq!(optional_text(None, "Notes", 5).unwrap(), None);
        assert_eq!(optional_text(Some("  "), "Notes", 5).unwrap(), None);
        assert_eq!(
            optional_text(Some(" hi "), "Notes", 5).unwrap(),
            Some("hi".to_string())
        );
    }

    #[test]
    fn amounts_are_bounded() {
        assert!(positive_amount(0, "Amount").is_err());
        assert!(positive_amount(-5, "Amount").is_err());
        assert_eq!(positive_amount(1, "Amount").unwrap(), 1);
        assert!(positive_amount(MAX_AMOUNT_CENTS + 1, "Amount").is_err());
        assert_eq!(non_negative_amount(0, "Limit").unwrap(), 0);
        assert!(non_negative_amount(-1, "Limit").is_err());
    }

    #[test]
    fn quantity_must_be_in_range() {
        assert!(quantity(0, "Quantity").is_err());
        assert_eq!(quantity(3, "Quantity").unwrap(), 3);
        assert!(quantity(MAX_QUANTITY + 1, "Quantity").is_err());
    }

    #[test]
    fn reversed_date_range_is_rejected() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        assert!(date_range(day(1), day(1)).is_ok());
        assert!(date_range(day(2), day(1)).is_err());
    }
}
