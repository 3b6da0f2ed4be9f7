//! User repository for database operations.
//!
//! Users are created by the identity provider. The storefront keeps a local
//! mirror so orders, carts and stores can reference them by foreign key.

use sqlx::PgPool;
use tracing::instrument;

use marketplace_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, image, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.\"user\" WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Insert the user, or refresh their profile if it changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, email, name, image), fields(user_id = %id))]
    pub async fn upsert(
        &self,
        id: &UserId,
        email: &Email,
        name: &str,
        image: &str,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO storefront."user" (id, email, name, image)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    name = EXCLUDED.name,
                    image = EXCLUDED.image,
                    updated_at = NOW()
                WHERE (storefront."user".email, storefront."user".name, storefront."user".image)
                    IS DISTINCT FROM (EXCLUDED.email, EXCLUDED.name, EXCLUDED.image)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(image)
        .fetch_optional(self.pool)
        .await?;

        // No row comes back when the profile was already current
        match user {
            Some(user) => Ok(user),
            None => self.get_by_id(id).await?.ok_or(RepositoryError::NotFound),
        }
    }

    /// Total number of known users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM storefront."user""#)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
