//! Hosted checkout client for the payment processor.
//!
//! Only the two operations the storefront needs are implemented: creating a
//! hosted checkout session ([`PaymentClient::create_checkout_session`]) and
//! verifying the signature of the processor's webhooks ([`webhook`]).

pub mod webhook;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::PaymentsConfig;

/// Errors that can occur when talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The processor rejected the request.
    #[error("payment API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Webhook signature header missing, malformed, stale or wrong.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    /// Webhook body isn't a valid event.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// One line of a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub image: Option<String>,
    /// Unit price in minor currency units (cents).
    pub unit_amount: i64,
    pub quantity: i32,
}

/// Everything needed to open a hosted checkout session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub expires_at: DateTime<Utc>,
    /// Echoed back verbatim on the processor's webhooks.
    pub metadata: Vec<(String, String)>,
}

/// A created hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    /// Where to redirect the customer.
    pub url: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

/// Processor wire format of a created session.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for the payment processor's REST API.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    sessions_url: Url,
    secret_key: SecretString,
    currency: String,
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the sessions URL can't be built.
    pub fn new(config: &PaymentsConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            inner: Arc::new(PaymentClientInner {
                client: reqwest::Client::new(),
                sessions_url: config.api_url.join("v1/checkout/sessions")?,
                secret_key: config.secret_key.clone(),
                currency: config.currency.clone(),
            }),
        })
    }

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if the processor rejects the request, or
    /// `PaymentError::Http` if it can't be reached.
    #[instrument(skip_all, fields(lines = request.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = session_form(request, &self.inner.currency);

        let response = self
            .inner
            .client
            .post(self.inner.sessions_url.clone())
            .basic_auth(self.inner.secret_key.expose_secret(), None::<&str>)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            tracing::error!(status = %status, message = %message, "Checkout session creation failed");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = serde_json::from_str(&body)?;
        let url = session.url.ok_or_else(|| PaymentError::Api {
            status: status.as_u16(),
            message: "session has no redirect url".to_string(),
        })?;
        let expires_at =
            DateTime::from_timestamp(session.expires_at, 0).unwrap_or(request.expires_at);

        Ok(CheckoutSession {
            id: session.id,
            url,
            expires_at,
        })
    }
}

/// Flatten a session request into the processor's bracketed form encoding.
fn session_form(request: &SessionRequest, currency: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("expires_at".to_string(), request.expires_at.timestamp().to_string()),
    ];

    for (i, line) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), currency.to_string()));
        form.push((format!("{prefix}[price_data][product_data][name]"), line.name.clone()));
        if let Some(image) = &line.image {
            form.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> SessionRequest {
        SessionRequest {
            line_items: vec![
                SessionLineItem {
                    name: "Mango".to_string(),
                    image: Some("https://cdn.test/mango.png".to_string()),
                    unit_amount: 4000,
                    quantity: 2,
                },
                SessionLineItem {
                    name: "Shipping".to_string(),
                    image: None,
                    unit_amount: 500,
                    quantity: 1,
                },
            ],
            success_url: "https://shop.test/loading?nextUrl=orders".to_string(),
            cancel_url: "https://shop.test/cart".to_string(),
            expires_at: DateTime::from_timestamp(1_800_000_000, 0).unwrap(),
            metadata: vec![
                ("orderIds".to_string(), "a,b".to_string()),
                ("userId".to_string(), "user_1".to_string()),
            ],
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_session_form_flattens_lines_and_metadata() {
        let form = session_form(&request(), "usd");

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "expires_at"), Some("1800000000"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("4000"));
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://cdn.test/mango.png")
        );
        assert_eq!(value(&form, "line_items[1][price_data][product_data][name]"), Some("Shipping"));
        assert_eq!(value(&form, "line_items[1][price_data][product_data][images][0]"), None);
        assert_eq!(value(&form, "metadata[orderIds]"), Some("a,b"));
        assert_eq!(value(&form, "metadata[userId]"), Some("user_1"));
    }

    #[test]
    fn test_checkout_session_serializes_for_clients() {
        let session = CheckoutSession {
            id: "cs_test_1".to_string(),
            url: "https://pay.test/cs_test_1".to_string(),
            expires_at: DateTime::from_timestamp(1_800_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["url"], "https://pay.test/cs_test_1");
        assert_eq!(json["expiresAt"], 1_800_000_000);
    }
}
