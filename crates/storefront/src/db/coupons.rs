//! Coupon database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use crate::models::{Coupon, NewCoupon};

const COUPON_COLUMNS: &str =
    "code, description, discount, for_new_user, for_member, is_public, expires_at, created_at";

/// Find an unexpired coupon by code, ignoring case.
///
/// Expired coupons are treated as nonexistent.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_active(
    pool: &PgPool,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<Coupon>, RepositoryError> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM storefront.coupon WHERE code = UPPER($1) AND expires_at > $2"
    ))
    .bind(code.trim())
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(coupon)
}

/// List all coupons, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<Coupon>, RepositoryError> {
    let coupons = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM storefront.coupon ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(coupons)
}

/// Create a coupon. The code must already be validated (upper case).
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the code already exists.
#[instrument(skip(pool, coupon), fields(code = %coupon.code))]
pub async fn create(pool: &PgPool, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
    insert(pool, coupon, false).await
}

/// Create or overwrite a coupon (catalog seeding).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert(pool: &PgPool, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
    insert(pool, coupon, true).await
}

async fn insert(pool: &PgPool, coupon: &NewCoupon, overwrite: bool) -> Result<Coupon, RepositoryError> {
    let on_conflict = if overwrite {
        r"ON CONFLICT (code) DO UPDATE
            SET description = EXCLUDED.description,
                discount = EXCLUDED.discount,
                for_new_user = EXCLUDED.for_new_user,
                for_member = EXCLUDED.for_member,
                is_public = EXCLUDED.is_public,
                expires_at = EXCLUDED.expires_at"
    } else {
        ""
    };

    sqlx::query_as::<_, Coupon>(&format!(
        r"
        INSERT INTO storefront.coupon
            (code, description, discount, for_new_user, for_member, is_public, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        {on_conflict}
        RETURNING {COUPON_COLUMNS}
        "
    ))
    .bind(&coupon.code)
    .bind(&coupon.description)
    .bind(coupon.discount)
    .bind(coupon.for_new_user)
    .bind(coupon.for_member)
    .bind(coupon.is_public)
    .bind(coupon.expires_at)
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::unique(e, "coupon code already exists"))
}

/// Delete a coupon by code, ignoring case.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no coupon has this code.
#[instrument(skip(pool))]
pub async fn delete(pool: &PgPool, code: &str) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.coupon WHERE code = UPPER($1)")
        .bind(code.trim())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
