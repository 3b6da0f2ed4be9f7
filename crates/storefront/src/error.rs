//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Errors render as `{"error": <message>, "code": <machine code>}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;
use crate::payments::PaymentError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Identity provider call failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Payment processor call or webhook failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl AppError {
    /// HTTP status, machine code and client-safe message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Database(err) | Self::Checkout(CheckoutError::Repository(err)) => {
                repository_parts(err)
            }
            Self::Checkout(err) => checkout_parts(err),
            Self::Identity(IdentityError::InvalidToken) => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Invalid or expired session".to_string(),
            ),
            Self::Identity(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_identity_error",
                "Identity provider unavailable".to_string(),
            ),
            Self::Payment(err @ (PaymentError::InvalidSignature(_) | PaymentError::InvalidPayload(_))) => {
                (StatusCode::BAD_REQUEST, "invalid_webhook", err.to_string())
            }
            Self::Payment(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_payment_error",
                "Payment provider error".to_string(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthenticated", msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        }
    }
}

fn repository_parts(err: &RepositoryError) -> (StatusCode, &'static str, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "not_found", "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
        // Don't expose internal error details to clients
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error".to_string(),
        ),
    }
}

fn checkout_parts(err: &CheckoutError) -> (StatusCode, &'static str, String) {
    let status = match err {
        CheckoutError::InvalidRequest(_)
        | CheckoutError::CouponNotFound
        | CheckoutError::CouponNotEligible(_) => StatusCode::BAD_REQUEST,
        CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::DuplicateRequest => StatusCode::CONFLICT,
        CheckoutError::UpstreamPaymentError(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::TransactionFailure { .. } | CheckoutError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = match err {
        CheckoutError::TransactionFailure { code, .. } => format!(
            "Order transaction failed (SQLSTATE {})",
            code.as_deref().unwrap_or("unknown")
        ),
        CheckoutError::UpstreamPaymentError(_) => {
            "Payment session could not be created; no orders were placed".to_string()
        }
        other => other.to_string(),
    };
    (status, err.code(), message)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (
            status,
            Json(ErrorBody {
                error: message,
                code,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
