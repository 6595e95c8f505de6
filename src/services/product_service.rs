//! Product catalog service.
//!
//! Deleting a product leaves existing line items intact: they carry their
//! own copy of name and price, and their `product_id` is set to NULL.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::product::{Product, ProductRequest},
    services::audit,
};

pub async fn list_products(pool: &DbPool) -> Result<Vec<Product>, AppError> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY category NULLS LAST, name, id")
            .fetch_all(pool)
            .await?;
    Ok(products)
}

pub async fn get_product(pool: &DbPool, product_id: Uuid) -> Result<Product, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

/// Products with the given ids; unknown ids are simply absent.
pub async fn products_by_ids(pool: &DbPool, ids: &[Uuid]) -> Result<Vec<Product>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(products)
}

/// Add a product; the request must already be validated.
pub async fn create_product(pool: &DbPool, request: ProductRequest) -> Result<Product, AppError> {
    let mut tx = pool.begin().await?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, price_cents, category, is_prescription)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(request.price_cents)
    .bind(&request.category)
    .bind(request.is_prescription)
    .fetch_one(&mut *tx)
    .await?;

    audit::record(
        &mut *tx,
        "create",
        "products",
        Some(product.id),
        format!("name={} price_cents={}", product.name, product.price_cents),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok(product)
}

/// Replace a product's fields. Past debt items keep the old name and price.
pub async fn update_product(
    pool: &DbPool,
    product_id: Uuid,
    request: ProductRequest,
) -> Result<Product, AppError> {
    let mut tx = pool.begin().await?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $2, price_cents = $3, category = $4, is_prescription = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(&request.name)
    .bind(request.price_cents)
    .bind(&request.category)
    .bind(request.is_prescription)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Product"))?;

    audit::record(
        &mut *tx,
        "update",
        "products",
        Some(product.id),
        format!("name={} price_cents={}", product.name, product.price_cents),
    )
    .await?;

    tx.commit().await?;
    Ok(product)
}

pub async fn delete_product(pool: &DbPool, product_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let name: String = sqlx::query_scalar("DELETE FROM products WHERE id = $1 RETURNING name")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    audit::record(
        &mut *tx,
        "delete",
        "products",
        Some(product_id),
        format!("name={name}"),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(product_id = %product_id, "Product deleted");
    Ok(())
}
