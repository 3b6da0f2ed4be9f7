//! Shipping address types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_core::{AddressId, Email, UserId};

use super::require_non_blank;

/// A user's shipping address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub name: String,
    pub email: Email,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/addresses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub name: String,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
}

impl NewAddress {
    /// Check every field is present and the email parses.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<Email, String> {
        for (field, value) in [
            ("name", &self.name),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("country", &self.country),
            ("phone", &self.phone),
        ] {
            require_non_blank(field, value)?;
        }
        Email::parse(&self.email).map_err(|e| format!("email: {e}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> NewAddress {
        NewAddress {
            name: "Ada Buyer".to_string(),
            email: "ada@example.com".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            country: "US".to_string(),
            phone: "+1 555 0100".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_address() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_names_missing_field() {
        let mut address = sample();
        address.city = "  ".to_string();
        assert_eq!(address.validate().unwrap_err(), "city is required");
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut address = sample();
        address.email = "ada-at-example".to_string();
        assert!(address.validate().unwrap_err().starts_with("email:"));
    }
}
