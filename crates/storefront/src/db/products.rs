//! Product database operations.
//!
//! Public queries only return products from stores that are approved and
//! active. Checkout reads go through [`lock_for_checkout`] on the caller's
//! transaction so concurrent checkouts of the same product serialise.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use marketplace_core::{ProductId, StoreId};

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductListing};

const PRODUCT_COLUMNS: &str = "p.id, p.store_id, p.name, p.description, p.mrp, p.price, p.images, \
                               p.category, p.stock_quantity, p.created_at, p.updated_at";

/// Default and maximum page size for catalog listings.
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring of name or description.
    pub query: Option<String>,
    pub limit: Option<i64>,
}

/// List in-stock products from selling stores, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
#[instrument(skip(pool))]
pub async fn list_public(
    pool: &PgPool,
    filter: &ProductFilter,
) -> Result<Vec<ProductListing>, RepositoryError> {
    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let pattern = filter
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));

    let products = sqlx::query_as::<_, ProductListing>(&format!(
        r"
        SELECT {PRODUCT_COLUMNS},
               COALESCE(ROUND(AVG(r.rating), 2), 0) AS average_rating,
               COUNT(r.id) AS rating_count
        FROM storefront.product p
        JOIN storefront.store s ON s.id = p.store_id
        LEFT JOIN storefront.rating r ON r.product_id = p.id
        WHERE s.status = 'approved' AND s.is_active
          AND p.stock_quantity > 0
          AND ($1::text IS NULL OR p.category = $1)
          AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
        GROUP BY p.id
        ORDER BY p.created_at DESC
        LIMIT $3
        "
    ))
    .bind(filter.category.as_deref())
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Get one product from a selling store, in stock or not.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_public(
    pool: &PgPool,
    id: ProductId,
) -> Result<Option<ProductListing>, RepositoryError> {
    let product = sqlx::query_as::<_, ProductListing>(&format!(
        r"
        SELECT {PRODUCT_COLUMNS},
               COALESCE(ROUND(AVG(r.rating), 2), 0) AS average_rating,
               COUNT(r.id) AS rating_count
        FROM storefront.product p
        JOIN storefront.store s ON s.id = p.store_id
        LEFT JOIN storefront.rating r ON r.product_id = p.id
        WHERE p.id = $1 AND s.status = 'approved' AND s.is_active
        GROUP BY p.id
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

/// Fetch products by ID, in any order. Unknown IDs are skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_many(pool: &PgPool, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Lock the given products `FOR UPDATE` in ID order and return them.
///
/// Unknown IDs are absent from the result; the caller decides how to report them.
///
/// # Errors
///
/// Returns `sqlx::Error` so the checkout can surface the SQLSTATE.
pub async fn lock_for_checkout(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, sqlx::Error> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    sqlx::query_as::<_, Product>(&format!(
        r"
        SELECT {PRODUCT_COLUMNS}
        FROM storefront.product p
        WHERE p.id = ANY($1)
        ORDER BY p.id
        FOR UPDATE
        "
    ))
    .bind(&sorted)
    .fetch_all(conn)
    .await
}

/// Decrement stock by `quantity`, never below zero, and return how many units
/// were actually taken.
///
/// # Errors
///
/// Returns `sqlx::Error` so the checkout can surface the SQLSTATE.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        r"
        UPDATE storefront.product p
        SET stock_quantity = GREATEST(p.stock_quantity - $2, 0), updated_at = NOW()
        FROM (SELECT id, stock_quantity AS old FROM storefront.product WHERE id = $1) prev
        WHERE p.id = prev.id
        RETURNING prev.old - p.stock_quantity
        ",
    )
    .bind(id)
    .bind(quantity)
    .fetch_one(conn)
    .await
}

/// List all products of a store, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_store(pool: &PgPool, store_id: StoreId) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.store_id = $1 ORDER BY p.created_at DESC"
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Add a product to a store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
#[instrument(skip(pool, product), fields(store_id = %store_id, name = %product.name))]
pub async fn create(
    pool: &PgPool,
    store_id: StoreId,
    product: &NewProduct,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r"
        INSERT INTO storefront.product AS p
            (store_id, name, description, mrp, price, images, category, stock_quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {PRODUCT_COLUMNS}
        "
    ))
    .bind(store_id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.mrp)
    .bind(product.price)
    .bind(&product.images)
    .bind(&product.category)
    .bind(product.stock_quantity)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

/// Set the stock of one of the store's own products.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product doesn't belong to the store.
#[instrument(skip(pool), fields(store_id = %store_id, product_id = %id))]
pub async fn set_stock(
    pool: &PgPool,
    store_id: StoreId,
    id: ProductId,
    stock_quantity: i32,
) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(&format!(
        r"
        UPDATE storefront.product AS p
        SET stock_quantity = $3, updated_at = NOW()
        WHERE p.id = $1 AND p.store_id = $2
        RETURNING {PRODUCT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(store_id)
    .bind(stock_quantity)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Insert or update a product by `(store_id, name)` (catalog seeding).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_seeded(
    pool: &PgPool,
    store_id: StoreId,
    product: &NewProduct,
) -> Result<Product, RepositoryError> {
    let existing: Option<ProductId> = sqlx::query_scalar(
        "SELECT id FROM storefront.product WHERE store_id = $1 AND name = $2 LIMIT 1",
    )
    .bind(store_id)
    .bind(&product.name)
    .fetch_optional(pool)
    .await?;

    let Some(id) = existing else {
        return create(pool, store_id, product).await;
    };

    let product = sqlx::query_as::<_, Product>(&format!(
        r"
        UPDATE storefront.product AS p
        SET description = $2, mrp = $3, price = $4, images = $5, category = $6,
            stock_quantity = $7, updated_at = NOW()
        WHERE p.id = $1
        RETURNING {PRODUCT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(&product.description)
    .bind(product.mrp)
    .bind(product.price)
    .bind(&product.images)
    .bind(&product.category)
    .bind(product.stock_quantity)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

/// Count products, optionally for a single store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(pool: &PgPool, store_id: Option<StoreId>) -> Result<i64, RepositoryError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM storefront.product WHERE $1::uuid IS NULL OR store_id = $1",
    )
    .bind(store_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
