//! Address database operations.

use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use marketplace_core::{AddressId, Email, UserId};

use super::RepositoryError;
use crate::models::{Address, NewAddress};

const ADDRESS_COLUMNS: &str =
    "id, user_id, name, email, street, city, state, zip, country, phone, created_at";

/// List the user's addresses, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &PgPool, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
    let addresses = sqlx::query_as::<_, Address>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM storefront.address WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(addresses)
}

/// Save a new address for the user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
#[instrument(skip(pool, address, email), fields(user_id = %user_id))]
pub async fn create(
    pool: &PgPool,
    user_id: &UserId,
    address: &NewAddress,
    email: &Email,
) -> Result<Address, RepositoryError> {
    let address = sqlx::query_as::<_, Address>(&format!(
        r"
        INSERT INTO storefront.address (user_id, name, email, street, city, state, zip, country, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ADDRESS_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(address.name.trim())
    .bind(email)
    .bind(address.street.trim())
    .bind(address.city.trim())
    .bind(address.state.trim())
    .bind(address.zip.trim())
    .bind(address.country.trim())
    .bind(address.phone.trim())
    .fetch_one(pool)
    .await?;

    Ok(address)
}

/// Whether the address exists and belongs to the user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_owned_by<'e>(
    executor: impl PgExecutor<'e>,
    id: AddressId,
    user_id: &UserId,
) -> Result<bool, RepositoryError> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM storefront.address WHERE id = $1 AND user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;

    Ok(owned)
}

/// Fetch addresses by ID, in any order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_many(pool: &PgPool, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
    let addresses = sqlx::query_as::<_, Address>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM storefront.address WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(addresses)
}
