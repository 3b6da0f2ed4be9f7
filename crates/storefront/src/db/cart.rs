//! Cart database operations.
//!
//! The cart is a set of `(product, quantity)` rows per user.

use std::collections::BTreeMap;

use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use marketplace_core::{ProductId, UserId};

use super::RepositoryError;

/// Get the user's cart as `product -> quantity`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_cart(
    pool: &PgPool,
    user_id: &UserId,
) -> Result<BTreeMap<ProductId, i32>, RepositoryError> {
    let rows: Vec<(ProductId, i32)> = sqlx::query_as(
        "SELECT product_id, quantity FROM storefront.cart_item WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Replace the user's cart with `entries`. Quantities must already be positive.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if any product doesn't exist.
#[instrument(skip(pool, entries), fields(user_id = %user_id, lines = entries.len()))]
pub async fn replace_cart(
    pool: &PgPool,
    user_id: &UserId,
    entries: &BTreeMap<ProductId, i32>,
) -> Result<(), RepositoryError> {
    let (product_ids, quantities): (Vec<ProductId>, Vec<i32>) =
        entries.iter().map(|(id, qty)| (*id, *qty)).unzip();

    let mut tx = pool.begin().await?;

    clear_cart(&mut *tx, user_id).await?;

    sqlx::query(
        r"
        INSERT INTO storefront.cart_item (user_id, product_id, quantity)
        SELECT $1, product_id, quantity
        FROM UNNEST($2::uuid[], $3::int4[]) AS t(product_id, quantity)
        ",
    )
    .bind(user_id)
    .bind(&product_ids)
    .bind(&quantities)
    .execute(&mut *tx)
    .await
    .map_err(RepositoryError::missing_reference)?;

    tx.commit().await?;
    Ok(())
}

/// Remove every line from the user's cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear_cart<'e>(
    executor: impl PgExecutor<'e>,
    user_id: &UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}
