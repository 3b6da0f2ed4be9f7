//! Order route handlers: checkout and order history.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::orders;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::OrderView;
use crate::services::checkout::{CheckoutError, CheckoutRequest, CheckoutResponse};
use crate::state::AppState;

/// Header carrying the client's idempotency key for checkout.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Place orders for the caller's items.
///
/// POST /api/orders
///
/// # Errors
///
/// Returns `AppError::Checkout` describing why nothing was placed.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    headers: HeaderMap,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let Json(request) =
        payload.map_err(|rejection| CheckoutError::InvalidRequest(rejection.body_text()))?;

    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            CheckoutError::InvalidRequest("Idempotency-Key must be visible ASCII".to_string())
        })?),
        None => None,
    };

    let response = state
        .checkout()
        .place_order(&caller, request, idempotency_key)
        .await?;

    Ok(Json(response))
}

#[derive(Serialize)]
pub struct OrdersResponse {
    orders: Vec<OrderView>,
}

/// The caller's placed orders, newest first.
///
/// GET /api/orders
///
/// # Errors
///
/// Returns `AppError::Database` if the lookup fails.
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<OrdersResponse>> {
    let orders = orders::list_for_user(state.pool(), &caller.user_id).await?;
    Ok(Json(OrdersResponse { orders }))
}
