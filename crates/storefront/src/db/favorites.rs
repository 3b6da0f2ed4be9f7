//! Favorites database operations.

use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{ProductId, UserId};

use super::RepositoryError;

/// List the user's favorite products, most recent first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &PgPool, user_id: &UserId) -> Result<Vec<ProductId>, RepositoryError> {
    let ids = sqlx::query_scalar(
        "SELECT product_id FROM storefront.favorite WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Toggle a favorite in a single statement. Returns whether it is now favorited.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product doesn't exist.
#[instrument(skip(pool), fields(user_id = %user_id, product_id = %product_id))]
pub async fn toggle(
    pool: &PgPool,
    user_id: &UserId,
    product_id: ProductId,
) -> Result<bool, RepositoryError> {
    let favorited: bool = sqlx::query_scalar(
        r"
        WITH removed AS (
            DELETE FROM storefront.favorite
            WHERE user_id = $1 AND product_id = $2
            RETURNING 1
        ),
        inserted AS (
            INSERT INTO storefront.favorite (user_id, product_id)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM removed)
            ON CONFLICT DO NOTHING
            RETURNING 1
        )
        SELECT EXISTS (SELECT 1 FROM inserted)
        ",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(pool)
    .await
    .map_err(RepositoryError::missing_reference)?;

    Ok(favorited)
}
