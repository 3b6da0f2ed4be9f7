//! Rating database operations.

use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{ProductId, StoreId, UserId};

use super::RepositoryError;
use crate::models::{NewRating, Rating};

const RATING_COLUMNS: &str = "id, user_id, product_id, order_id, rating, review, created_at";

/// Record a rating.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user already rated this product
/// for this order.
#[instrument(skip(pool, rating), fields(user_id = %user_id, product_id = %rating.product_id))]
pub async fn create(pool: &PgPool, user_id: &UserId, rating: &NewRating) -> Result<Rating, RepositoryError> {
    sqlx::query_as::<_, Rating>(&format!(
        r"
        INSERT INTO storefront.rating (user_id, product_id, order_id, rating, review)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {RATING_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(rating.product_id)
    .bind(rating.order_id)
    .bind(rating.rating)
    .bind(rating.review.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::unique(e, "product already rated for this order"))
}

/// The user's ratings, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_user(pool: &PgPool, user_id: &UserId) -> Result<Vec<Rating>, RepositoryError> {
    let ratings = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM storefront.rating WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ratings)
}

/// A product's ratings, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_product(pool: &PgPool, product_id: ProductId) -> Result<Vec<Rating>, RepositoryError> {
    let ratings = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM storefront.rating WHERE product_id = $1 ORDER BY created_at DESC"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(ratings)
}

/// Ratings of every product in a store, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_store(pool: &PgPool, store_id: StoreId) -> Result<Vec<Rating>, RepositoryError> {
    let ratings = sqlx::query_as::<_, Rating>(
        r"
        SELECT r.id, r.user_id, r.product_id, r.order_id, r.rating, r.review, r.created_at
        FROM storefront.rating r
        JOIN storefront.product p ON p.id = r.product_id
        WHERE p.store_id = $1
        ORDER BY r.created_at DESC
        ",
    )
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    Ok(ratings)
}
