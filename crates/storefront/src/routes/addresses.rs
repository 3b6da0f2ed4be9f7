//! Shipping address handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;

use crate::db::addresses;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, NewAddress};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AddressesResponse {
    addresses: Vec<Address>,
}

/// GET /api/addresses
///
/// # Errors
///
/// Returns `AppError::Database` if the lookup fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<AddressesResponse>> {
    let addresses = addresses::list(state.pool(), &caller.user_id).await?;
    Ok(Json(AddressesResponse { addresses }))
}

#[derive(Serialize)]
pub struct AddressResponse {
    address: Address,
}

/// POST /api/addresses
///
/// # Errors
///
/// Returns `AppError::BadRequest` if a field is missing or the email is invalid.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    payload: std::result::Result<Json<NewAddress>, JsonRejection>,
) -> Result<(StatusCode, Json<AddressResponse>)> {
    let Json(new_address) = payload?;
    let email = new_address.validate().map_err(AppError::BadRequest)?;

    let address = addresses::create(state.pool(), &caller.user_id, &new_address, &email).await?;
    Ok((StatusCode::CREATED, Json(AddressResponse { address })))
}
