//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{Email, UserId};

/// A storefront user, mirrored from the identity provider.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity-provider user ID.
    pub id: UserId,
    /// Primary email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub image: String,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
    /// When the profile was last refreshed from the identity provider.
    pub updated_at: DateTime<Utc>,
}
