//! Seller store database operations.

use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{Email, StoreId, StoreStatus, UserId};

use super::RepositoryError;
use crate::models::{NewStore, Store, StoreSummary};

const STORE_COLUMNS: &str = "id, owner_id, name, username, description, email, contact, \
                             address, logo, status, is_active, created_at, updated_at";

/// Submit a store application (status `pending`, inactive).
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the owner already has a store or the
/// username is taken.
#[instrument(skip(pool, store, email), fields(owner_id = %owner_id, username = %store.username))]
pub async fn create_store(
    pool: &PgPool,
    owner_id: &UserId,
    store: &NewStore,
    email: &Email,
) -> Result<Store, RepositoryError> {
    sqlx::query_as::<_, Store>(&format!(
        r"
        INSERT INTO storefront.store (owner_id, name, username, description, email, contact, address, logo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {STORE_COLUMNS}
        "
    ))
    .bind(owner_id)
    .bind(&store.name)
    .bind(&store.username)
    .bind(&store.description)
    .bind(email)
    .bind(&store.contact)
    .bind(&store.address)
    .bind(&store.logo)
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::unique(e, "store already exists or username is taken"))
}

/// Get the store owned by a user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_owner(pool: &PgPool, owner_id: &UserId) -> Result<Option<Store>, RepositoryError> {
    let store = sqlx::query_as::<_, Store>(&format!(
        "SELECT {STORE_COLUMNS} FROM storefront.store WHERE owner_id = $1"
    ))
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(store)
}

/// Get a store's public summary.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_summary(pool: &PgPool, id: StoreId) -> Result<Option<StoreSummary>, RepositoryError> {
    let store = sqlx::query_as::<_, StoreSummary>(
        "SELECT id, name, username, logo FROM storefront.store WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(store)
}

/// List stores, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_stores(
    pool: &PgPool,
    status: Option<StoreStatus>,
) -> Result<Vec<Store>, RepositoryError> {
    let stores = sqlx::query_as::<_, Store>(&format!(
        r"
        SELECT {STORE_COLUMNS} FROM storefront.store
        WHERE $1::storefront.store_status IS NULL OR status = $1
        ORDER BY created_at DESC
        "
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(stores)
}

/// Record an admin decision. Approval activates the store; rejection deactivates it.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the store doesn't exist.
#[instrument(skip(pool), fields(store_id = %id, status = %status))]
pub async fn set_status(
    pool: &PgPool,
    id: StoreId,
    status: StoreStatus,
) -> Result<Store, RepositoryError> {
    sqlx::query_as::<_, Store>(&format!(
        r"
        UPDATE storefront.store
        SET status = $2, is_active = ($2 = 'approved'), updated_at = NOW()
        WHERE id = $1
        RETURNING {STORE_COLUMNS}
        "
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Flip the active flag of an approved store.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no approved store has this ID.
#[instrument(skip(pool), fields(store_id = %id))]
pub async fn toggle_active(pool: &PgPool, id: StoreId) -> Result<Store, RepositoryError> {
    sqlx::query_as::<_, Store>(&format!(
        r"
        UPDATE storefront.store
        SET is_active = NOT is_active, updated_at = NOW()
        WHERE id = $1 AND status = 'approved'
        RETURNING {STORE_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Upsert a store by username (catalog seeding).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_seeded(
    pool: &PgPool,
    owner_id: &UserId,
    store: &NewStore,
    email: &Email,
    status: StoreStatus,
) -> Result<Store, RepositoryError> {
    let store = sqlx::query_as::<_, Store>(&format!(
        r"
        INSERT INTO storefront.store
            (owner_id, name, username, description, email, contact, address, logo, status, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9 = 'approved')
        ON CONFLICT (owner_id) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                email = EXCLUDED.email,
                contact = EXCLUDED.contact,
                address = EXCLUDED.address,
                logo = EXCLUDED.logo,
                status = EXCLUDED.status,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
        RETURNING {STORE_COLUMNS}
        "
    ))
    .bind(owner_id)
    .bind(&store.name)
    .bind(&store.username)
    .bind(&store.description)
    .bind(email)
    .bind(&store.contact)
    .bind(&store.address)
    .bind(&store.logo)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(store)
}

/// Number of stores by status, as `(pending, approved, rejected)`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_by_status(pool: &PgPool) -> Result<(i64, i64, i64), RepositoryError> {
    let counts: (i64, i64, i64) = sqlx::query_as(
        r"
        SELECT
            COUNT(*) FILTER (WHERE status = 'pending'),
            COUNT(*) FILTER (WHERE status = 'approved'),
            COUNT(*) FILTER (WHERE status = 'rejected')
        FROM storefront.store
        ",
    )
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
