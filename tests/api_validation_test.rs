// Router tests for requests rejected before the database is touched.
// The pool points at an unreachable address, so any query would fail with 500.

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use test_helpers::lazy_state;

async fn send(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = pharmacy_ledger_server::router(lazy_state());

    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn customer_uri(suffix: &str) -> String {
    format!("/api/v1/customers/{}{suffix}", Uuid::new_v4())
}

#[tokio::test]
async fn blank_customer_name_is_rejected() {
    let (status, body) = send(
        "POST",
        "/api/v1/customers",
        Some(json!({ "name": "   ", "phone": "5551234" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["message"], "Name is required");
}

#[tokio::test]
async fn negative_credit_limit_is_rejected() {
    let (status, _) = send(
        "POST",
        "/api/v1/customers",
        Some(json!({ "name": "John Doe", "credit_limit_cents": -100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn debt_without_items_is_rejected() {
    let (status, body) = send(
        "POST",
        &customer_uri("/entries"),
        Some(json!({ "kind": "debt", "amount_cents": 1000 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "At least one item is required");
}

#[tokio::test]
async fn payment_without_method_is_rejected() {
    let (status, body) = send(
        "POST",
        &customer_uri("/entries"),
        Some(json!({ "kind": "payment", "amount_cents": 500 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Payment method is required");
}

#[tokio::test]
async fn write_off_needs_a_reason() {
    let (status, _) = send(
        "POST",
        &customer_uri("/entries"),
        Some(json!({ "kind": "write_off", "amount_cents": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn debt_form_without_complete_rows_is_rejected() {
    let (status, body) = send(
        "POST",
        &customer_uri("/debts"),
        Some(json!({
            "rows": [
                {},
                { "custom_name": "Gauze" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "Please add at least one product with a name and price"
    );
}

#[tokio::test]
async fn reversed_history_range_is_rejected() {
    let (status, _) = send(
        "GET",
        &customer_uri("/entries?start=2025-02-01&end=2025-01-01"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn negative_additional_amount_is_rejected() {
    let (status, _) = send("GET", &customer_uri("/balance?additional_cents=-5"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zero_donation_usage_is_rejected() {
    let uri = format!("/api/v1/donations/{}/apply", Uuid::new_v4());
    let (status, body) = send(
        "POST",
        &uri,
        Some(json!({ "customer_id": Uuid::new_v4(), "amount_cents": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Usage amount must be positive");
}

#[tokio::test]
async fn negative_donation_is_rejected() {
    let (status, _) = send(
        "POST",
        "/api/v1/donations",
        Some(json!({ "amount_cents": -100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn negative_product_price_is_rejected() {
    let (status, body) = send(
        "POST",
        "/api/v1/products",
        Some(json!({ "name": "Aspirin", "price_cents": -1 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Price cannot be negative");
}

#[tokio::test]
async fn negative_overdue_threshold_is_rejected() {
    let (status, _) = send("GET", "/api/v1/reports/overdue?days=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reversed_transactions_range_is_rejected() {
    let (status, _) = send(
        "GET",
        "/api/v1/reports/transactions?start=2025-03-02&end=2025-03-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_customer_id_is_a_client_error() {
    let (status, _) = send("GET", "/api/v1/customers/not-a-uuid/balance", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
