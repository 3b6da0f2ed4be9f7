//! Coupon types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::require_non_blank;

/// A percentage discount coupon.
///
/// Also serialized verbatim into `order.coupon` as the checkout-time snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Upper-case code.
    pub code: String,
    pub description: String,
    /// Percent off, `0 < discount <= 100`.
    pub discount: Decimal,
    /// Only valid for users with no prior orders.
    pub for_new_user: bool,
    /// Only valid for members.
    pub for_member: bool,
    /// Listed publicly.
    pub is_public: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Input for creating a coupon (admin API, CLI, catalog seed).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount: Decimal,
    #[serde(default)]
    pub for_new_user: bool,
    #[serde(default)]
    pub for_member: bool,
    #[serde(default)]
    pub is_public: bool,
    pub expires_at: DateTime<Utc>,
}

impl NewCoupon {
    /// Validate and normalise the code to upper case.
    ///
    /// # Errors
    ///
    /// Returns a message if the code is blank or contains whitespace, or the
    /// discount is outside `(0, 100]`.
    pub fn validate(&mut self) -> Result<(), String> {
        require_non_blank("code", &self.code)?;
        self.code = self.code.trim().to_uppercase();
        if self.code.chars().any(char::is_whitespace) {
            return Err("code must not contain whitespace".to_string());
        }
        if self.discount <= Decimal::ZERO || self.discount > Decimal::ONE_HUNDRED {
            return Err("discount must be greater than 0 and at most 100".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_coupon(code: &str, discount: i64) -> NewCoupon {
        NewCoupon {
            code: code.to_string(),
            description: String::new(),
            discount: Decimal::from(discount),
            for_new_user: false,
            for_member: false,
            is_public: true,
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn test_validate_uppercases_code() {
        let mut coupon = new_coupon(" new20 ", 20);
        assert!(coupon.validate().is_ok());
        assert_eq!(coupon.code, "NEW20");
    }

    #[test]
    fn test_validate_discount_bounds() {
        assert!(new_coupon("ZERO", 0).validate().is_err());
        assert!(new_coupon("ALL", 100).validate().is_ok());
        assert!(new_coupon("MORE", 101).validate().is_err());
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let coupon = Coupon {
            code: "SPRING".to_string(),
            description: String::new(),
            discount: Decimal::from(10),
            for_new_user: false,
            for_member: false,
            is_public: true,
            expires_at: now,
            created_at: now - Duration::days(1),
        };
        assert!(coupon.is_expired(now));
        assert!(!coupon.is_expired(now - Duration::seconds(1)));
    }
}
