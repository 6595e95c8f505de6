//! Product catalog HTTP handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::product::{Product, ProductRequest},
    services::product_service,
};

pub async fn list_products(State(pool): State<DbPool>) -> Result<Json<Vec<Product>>, AppError> {
    let products = product_service::list_products(&pool).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = product_service::get_product(&pool, product_id).await?;
    Ok(Json(product))
}

/// `POST /api/v1/products`
///
/// ```json
/// { "name": "Paracetamol 500mg", "price_cents": 450, "category": "Pain Relief" }
/// ```
pub async fn create_product(
    State(pool): State<DbPool>,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = product_service::create_product(&pool, request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<Product>, AppError> {
    let product = product_service::update_product(&pool, product_id, request.validate()?).await?;
    Ok(Json(product))
}

/// Remove a product from the catalog. Debt items that used it keep their
/// copied name and price.
pub async fn delete_product(
    State(pool): State<DbPool>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    product_service::delete_product(&pool, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
