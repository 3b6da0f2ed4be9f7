//! Authentication extractors.
//!
//! Callers authenticate with the identity provider's session token in an
//! `Authorization: Bearer` header. The token is verified on every request
//! (through the client's short-lived cache) and the local user row is kept
//! in sync with the provider's profile.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::stores;
use crate::db::users::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::identity::Caller;
use crate::models::Store;
use crate::state::AppState;

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(caller): RequireAuth) -> String {
///     format!("Hello, {}!", caller.email)
/// }
/// ```
pub struct RequireAuth(pub Caller);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(Self(caller.clone()));
        }

        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let caller = state.identity().verify(token).await?;

        UserRepository::new(state.pool())
            .upsert(&caller.user_id, &caller.email, &caller.name, &caller.image)
            .await?;

        set_sentry_user(&caller.user_id, Some(caller.email.as_str()));
        tracing::Span::current().record("user_id", caller.user_id.as_str());

        parts.extensions.insert(caller.clone());
        Ok(Self(caller))
    }
}

/// Extractor that requires the caller to own a store that is approved and active.
pub struct RequireSeller(pub Caller, pub Store);

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(caller) = RequireAuth::from_request_parts(parts, state).await?;

        let store = stores::get_by_owner(state.pool(), &caller.user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You don't have a store".to_string()))?;

        if !store.is_selling() {
            return Err(AppError::Forbidden(
                "Store is not approved or has been deactivated".to_string(),
            ));
        }

        Ok(Self(caller, store))
    }
}

/// Extractor that requires the caller's email to be on the admin allow-list.
pub struct RequireAdmin(pub Caller);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(caller) = RequireAuth::from_request_parts(parts, state).await?;

        if !state.config().is_admin_email(&caller.email) {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(caller))
    }
}

/// The token from `Authorization: Bearer <token>`, if well-formed.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
