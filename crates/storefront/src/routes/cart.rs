//! Cart route handlers.
//!
//! The client owns the cart while browsing and syncs the whole map.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::ProductId;

use crate::db::{RepositoryError, cart};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// `productId -> quantity` in both directions.
#[derive(Debug, Serialize, Deserialize)]
pub struct CartBody {
    pub cart: BTreeMap<ProductId, i32>,
}

/// GET /api/cart
///
/// # Errors
///
/// Returns `AppError::Database` if the lookup fails.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<CartBody>> {
    let cart = cart::get_cart(state.pool(), &caller.user_id).await?;
    Ok(Json(CartBody { cart }))
}

/// Replace the cart. Lines with a non-positive quantity are dropped.
///
/// PUT /api/cart
///
/// # Errors
///
/// Returns `AppError::BadRequest` if a product doesn't exist.
#[instrument(skip_all)]
pub async fn replace(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    payload: std::result::Result<Json<CartBody>, JsonRejection>,
) -> Result<Json<CartBody>> {
    let Json(body) = payload?;
    let cart: BTreeMap<_, _> = body.cart.into_iter().filter(|(_, qty)| *qty > 0).collect();

    cart::replace_cart(state.pool(), &caller.user_id, &cart)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::BadRequest("cart contains an unknown product".to_string()),
            other => other.into(),
        })?;

    Ok(Json(CartBody { cart }))
}
