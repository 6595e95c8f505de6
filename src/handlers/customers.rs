//! Customer registry HTTP handlers.
//!
//! This module implements the customer endpoints:
//! - GET/POST /api/v1/customers - Search or create customers
//! - GET /api/v1/customers/cards - Customer list with filter visibility
//! - GET/PUT/DELETE /api/v1/customers/{id} - Read, update or deactivate

use std::{collections::HashSet, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::customer::{CreateCustomerRequest, Customer, UpdateCustomerRequest},
    services::customer_service,
    views::customer_filter::{CardListing, CustomerCard, CustomerListView, ListFilter},
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// List active customers.
///
/// # Endpoint
///
/// `GET /api/v1/customers?q=john`
///
/// `q` matches name or phone, case-insensitively.
pub async fn list_customers(
    State(pool): State<DbPool>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Customer>>, AppError> {
    let customers = customer_service::list_customers(&pool, query.q.as_deref()).await?;
    Ok(Json(customers))
}

/// Create a new customer.
///
/// # Endpoint
///
/// `POST /api/v1/customers`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "John Doe",
///   "phone": "5551234",
///   "credit_limit_cents": 50000,
///   "grace_period_days": 7
/// }
/// ```
///
/// Omitted limits take the configured defaults.
///
/// # Response
///
/// - **Success (201 Created)**: the created customer
/// - **Error (400)**: blank name, negative limit or grace period
pub async fn create_customer(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let profile = request.into_profile(
        config.default_credit_limit_cents,
        config.default_grace_period_days,
    )?;
    let customer = customer_service::create_customer(&pool, profile).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = customer_service::get_customer(&pool, customer_id).await?;
    Ok(Json(customer))
}

/// Replace a customer's profile.
///
/// `PUT /api/v1/customers/{id}` with every profile field in the body.
pub async fn update_customer(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    let profile = request.into_profile()?;
    let customer = customer_service::update_customer(&pool, customer_id, profile).await?;
    Ok(Json(customer))
}

/// Deactivate a customer. History is kept; new entries are refused.
///
/// `DELETE /api/v1/customers/{id}`
pub async fn deactivate_customer(
    State(pool): State<DbPool>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = customer_service::deactivate_customer(&pool, customer_id).await?;
    Ok(Json(customer))
}

/// Customer cards with per-card visibility.
///
/// # Endpoint
///
/// `GET /api/v1/customers/cards?q=john&show_all=false`
///
/// The most recently active customers are visible by default; the rest
/// start hidden and appear with `show_all=true` or when they match `q`.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "query": "xyz",
///   "show_all": false,
///   "visible_count": 0,
///   "cards": [{ "id": "...", "name": "John Doe", "phone": "5551234", "initially_hidden": false, "visible": false }],
///   "empty_state": { "visible": true, "message": "No customers found matching \"xyz\"" }
/// }
/// ```
pub async fn customer_cards(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<CardListing>, AppError> {
    let customers = customer_service::list_customers(&pool, None).await?;
    let recent: HashSet<Uuid> = customer_service::recent_customer_ids(&pool, config.recent_customers_limit)
        .await?
        .into_iter()
        .collect();

    let cards = customers
        .into_iter()
        .map(|customer| CustomerCard {
            initially_hidden: !recent.contains(&customer.id),
            id: customer.id,
            name: customer.name,
            phone: customer.phone,
        })
        .collect();

    let mut view = CustomerListView::new(cards);
    view.apply(filter);
    Ok(Json(view.into()))
}
