//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Validation Errors**: Malformed or inconsistent input, nothing written
/// - **Resource Errors**: A referenced customer, product, entry or donation does not exist
/// - **Over-application**: A donation usage larger than what is left of the donation
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body or parameters are invalid, or the write would break a
    /// ledger invariant (e.g. debt amount differs from its item total).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    ///
    /// Returns HTTP 404 Not Found. The payload names the kind of record.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Donation usage exceeds the unused remainder of the donation.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error(
        "Requested amount ({requested_cents} cents) exceeds available donation funds ({remaining_cents} cents)"
    )]
    OverApplication {
        requested_cents: i64,
        remaining_cents: i64,
    },
}

impl AppError {
    /// Shorthand for building a validation error from any message.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `NotFound` → 404 Not Found
/// - `OverApplication` → 422 Unprocessable Entity
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::OverApplication { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "over_application",
                self.to_string(),
            ),
            AppError::Database(ref err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Customer"), StatusCode::NOT_FOUND),
            (
                AppError::OverApplication {
                    requested_cents: 7000,
                    remaining_cents: 6000,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn not_found_message_names_the_record() {
        assert_eq!(AppError::NotFound("Donation").to_string(), "Donation not found");
    }
}
