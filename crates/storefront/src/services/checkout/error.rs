//! Checkout error types.

use thiserror::Error;

use marketplace_core::ProductId;

use crate::db::RepositoryError;
use crate::payments::PaymentError;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Missing or malformed input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No unexpired coupon has this code.
    #[error("coupon not found")]
    CouponNotFound,

    /// The caller isn't allowed to use the coupon.
    #[error("coupon not eligible: {0}")]
    CouponNotEligible(&'static str),

    /// An item references a product that doesn't exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order transaction aborted; nothing was written.
    #[error("transaction failed ({}): {message}", code.as_deref().unwrap_or("no SQLSTATE"))]
    TransactionFailure {
        /// SQLSTATE reported by the database, if any.
        code: Option<String>,
        message: String,
    },

    /// The hosted checkout session couldn't be created; the orders were cancelled.
    #[error("payment session could not be created: {0}")]
    UpstreamPaymentError(#[source] PaymentError),

    /// Another request with the same idempotency key is in flight.
    #[error("a checkout with this idempotency key is already in progress")]
    DuplicateRequest,

    /// Repository error outside the order transaction.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) => Self::TransactionFailure {
                code: db_err.code().map(|c| c.into_owned()),
                message: db_err.message().to_string(),
            },
            _ => Self::TransactionFailure {
                code: None,
                message: e.to_string(),
            },
        }
    }
}

impl CheckoutError {
    /// Machine-readable error code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::CouponNotFound => "coupon_not_found",
            Self::CouponNotEligible(_) => "coupon_not_eligible",
            Self::ProductNotFound(_) => "product_not_found",
            Self::TransactionFailure { .. } => "transaction_failure",
            Self::UpstreamPaymentError(_) => "upstream_payment_error",
            Self::DuplicateRequest => "duplicate_request",
            Self::Repository(_) => "internal_error",
        }
    }
}
