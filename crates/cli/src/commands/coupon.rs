//! Coupon management commands.
//!
//! # Usage
//!
//! ```bash
//! mp-cli coupon create -c FIRST20 -d 20 --new-user --expires-in-days 14
//! mp-cli coupon create -c PLUS5 -d 5 --member --public
//! ```

use chrono::{Duration, Utc};
use marketplace_storefront::db::coupons;
use marketplace_storefront::models::NewCoupon;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during coupon operations.
#[derive(Debug, Error)]
pub enum CouponError {
    /// The coupon failed validation.
    #[error("Invalid coupon: {0}")]
    Invalid(String),

    /// The expiry must be in the future.
    #[error("Invalid expiry: {0} days")]
    InvalidExpiry(i64),
}

/// Flags collected from `coupon create`.
pub struct CouponOptions {
    pub code: String,
    pub discount: Decimal,
    pub description: String,
    pub for_new_user: bool,
    pub for_member: bool,
    pub is_public: bool,
    pub expires_in_days: i64,
}

impl CouponOptions {
    /// Build a validated coupon expiring `expires_in_days` from now.
    fn into_new_coupon(self) -> Result<NewCoupon, CouponError> {
        if !(1..=3650).contains(&self.expires_in_days) {
            return Err(CouponError::InvalidExpiry(self.expires_in_days));
        }

        let mut coupon = NewCoupon {
            code: self.code,
            description: self.description,
            discount: self.discount,
            for_new_user: self.for_new_user,
            for_member: self.for_member,
            is_public: self.is_public,
            expires_at: Utc::now() + Duration::days(self.expires_in_days),
        };
        coupon.validate().map_err(CouponError::Invalid)?;
        Ok(coupon)
    }
}

/// Create a new coupon.
///
/// # Errors
///
/// Returns an error if the coupon is invalid, the code already exists or the
/// database is unreachable.
pub async fn create(options: CouponOptions) -> Result<(), Box<dyn std::error::Error>> {
    let coupon = options.into_new_coupon()?;
    let pool = super::connect().await?;

    let created = coupons::create(&pool, &coupon).await?;

    tracing::info!(
        code = %created.code,
        discount = %created.discount,
        expires_at = %created.expires_at,
        "Coupon created"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn options() -> CouponOptions {
        CouponOptions {
            code: " welcome10 ".to_string(),
            discount: Decimal::from(10),
            description: String::new(),
            for_new_user: true,
            for_member: false,
            is_public: true,
            expires_in_days: 30,
        }
    }

    #[test]
    fn test_code_is_normalised() {
        let coupon = options().into_new_coupon().unwrap();
        assert_eq!(coupon.code, "WELCOME10");
        assert!(coupon.expires_at > Utc::now() + Duration::days(29));
    }

    #[test]
    fn test_rejects_bad_discount_and_expiry() {
        let mut bad = options();
        bad.discount = Decimal::from(120);
        assert!(matches!(bad.into_new_coupon(), Err(CouponError::Invalid(_))));

        let mut bad = options();
        bad.expires_in_days = 0;
        assert!(matches!(
            bad.into_new_coupon(),
            Err(CouponError::InvalidExpiry(0))
        ));
    }
}
