//! Checkout idempotency ledger.
//!
//! A row is written inside the checkout transaction, so it exists exactly when
//! the orders do. `response` is filled in after payment dispatch succeeds.

use sqlx::{PgConnection, PgPool};

use marketplace_core::{OrderId, UserId};

use super::RepositoryError;

/// A recorded checkout attempt.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckoutRequestRow {
    pub order_ids: Vec<OrderId>,
    /// Response body returned to the client, once dispatched.
    pub response: Option<serde_json::Value>,
}

/// Look up a previous attempt with the same key.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find(
    pool: &PgPool,
    user_id: &UserId,
    key: &str,
) -> Result<Option<CheckoutRequestRow>, RepositoryError> {
    let row = sqlx::query_as::<_, CheckoutRequestRow>(
        r"
        SELECT order_ids, response FROM storefront.checkout_request
        WHERE user_id = $1 AND idempotency_key = $2
        ",
    )
    .bind(user_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record the key inside the checkout transaction.
///
/// # Errors
///
/// Returns `sqlx::Error` (a unique violation when the key was taken concurrently).
pub async fn insert(
    conn: &mut PgConnection,
    user_id: &UserId,
    key: &str,
    order_ids: &[OrderId],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO storefront.checkout_request (user_id, idempotency_key, order_ids)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(user_id)
    .bind(key)
    .bind(order_ids)
    .execute(conn)
    .await?;

    Ok(())
}

/// Store the response body sent for this key.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn store_response(
    pool: &PgPool,
    user_id: &UserId,
    key: &str,
    response: &serde_json::Value,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.checkout_request SET response = $3
        WHERE user_id = $1 AND idempotency_key = $2
        ",
    )
    .bind(user_id)
    .bind(key)
    .bind(response)
    .execute(pool)
    .await?;

    Ok(())
}
