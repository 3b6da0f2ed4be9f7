//! Identity provider client.
//!
//! The storefront never sees passwords. Clients send the session token issued
//! by the identity provider as a bearer token; we exchange it for the caller's
//! profile and plans by calling the provider's token verification endpoint.
//! Verified callers are cached per token (hashed) for a short TTL.

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use marketplace_core::{Email, UserId};

use crate::config::IdentityConfig;

/// Errors that can occur when verifying a caller.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token is malformed, expired or revoked.
    #[error("invalid or expired session token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an unexpected status.
    #[error("identity provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider returned a profile we can't use.
    #[error("invalid profile from identity provider: {0}")]
    InvalidProfile(String),
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: UserId,
    pub email: Email,
    pub name: String,
    pub image: String,
    /// Active subscription plans (e.g. `plus`).
    pub plans: Vec<String>,
}

impl Caller {
    /// Whether the caller holds the named plan (case-insensitive).
    #[must_use]
    pub fn has_plan(&self, plan: &str) -> bool {
        self.plans.iter().any(|p| p.eq_ignore_ascii_case(plan))
    }
}

/// Wire format of the verification response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifiedSession {
    user_id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    plans: Vec<String>,
}

impl TryFrom<VerifiedSession> for Caller {
    type Error = IdentityError;

    fn try_from(session: VerifiedSession) -> Result<Self, Self::Error> {
        if session.user_id.trim().is_empty() {
            return Err(IdentityError::InvalidProfile("empty user id".to_string()));
        }
        let email = Email::parse(&session.email)
            .map_err(|e| IdentityError::InvalidProfile(format!("email: {e}")))?;

        Ok(Self {
            user_id: UserId::new(session.user_id),
            email,
            name: session.name.unwrap_or_default(),
            image: session.image_url.unwrap_or_default(),
            plans: session.plans,
        })
    }
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

/// Client for the identity provider's token verification API.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    verify_url: Url,
    secret_key: SecretString,
    cache: Cache<String, Caller>,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the verification URL can't be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, url::ParseError> {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client: reqwest::Client::new(),
                verify_url: config.api_url.join("v1/tokens/verify")?,
                secret_key: config.secret_key.clone(),
                cache,
            }),
        })
    }

    /// Verify a session token and return the caller it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the provider rejects the token,
    /// or another variant if the provider can't be reached or misbehaves.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Caller, IdentityError> {
        let cache_key = token_fingerprint(token);
        if let Some(caller) = self.inner.cache.get(&cache_key).await {
            debug!(user_id = %caller.user_id, "Cache hit for session token");
            return Ok(caller);
        }

        let response = self
            .inner
            .client
            .post(self.inner.verify_url.clone())
            .bearer_auth(self.inner.secret_key.expose_secret())
            .json(&VerifyRequest { token })
            .send()
            .await?;

        let status = response.status();
        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED
                | reqwest::StatusCode::NOT_FOUND
                | reqwest::StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Err(IdentityError::InvalidToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Identity provider returned non-success status"
            );
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let caller = Caller::try_from(response.json::<VerifiedSession>().await?)?;
        self.inner.cache.insert(cache_key, caller.clone()).await;
        Ok(caller)
    }
}

/// SHA-256 of the token, so raw tokens are never kept in memory as keys.
fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
