//! Seller store types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_core::{Email, StoreId, StoreStatus, UserId};

use super::require_non_blank;

/// A seller's store.
///
/// A store can sell once an admin has approved it and it is active.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub owner_id: UserId,
    pub name: String,
    pub username: String,
    pub description: String,
    pub email: Email,
    pub contact: String,
    pub address: String,
    pub logo: String,
    pub status: StoreStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Whether the store's products are visible and purchasable.
    #[must_use]
    pub fn is_selling(&self) -> bool {
        self.status == StoreStatus::Approved && self.is_active
    }
}

/// Public-facing subset of a store, embedded in product pages.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub id: StoreId,
    pub name: String,
    pub username: String,
    pub logo: String,
}

/// Body of `POST /api/store`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub description: String,
    pub email: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub logo: String,
}

impl NewStore {
    /// Validate the application and normalise the username to lower case.
    ///
    /// # Errors
    ///
    /// Returns a message if a required field is blank, the username contains
    /// anything other than ASCII letters, digits, `-` or `_`, or the email is
    /// invalid.
    pub fn validate(&mut self) -> Result<Email, String> {
        require_non_blank("name", &self.name)?;
        require_non_blank("username", &self.username)?;

        self.username = self.username.trim().to_ascii_lowercase();
        if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("username may only contain letters, digits, '-' and '_'".to_string());
        }

        Email::parse(&self.email).map_err(|e| format!("email: {e}"))
    }
}
