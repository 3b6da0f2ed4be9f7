//! Favorite product handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use marketplace_core::ProductId;

use crate::db::{RepositoryError, favorites};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Serialize)]
pub struct FavoritesResponse {
    favorites: Vec<ProductId>,
}

/// GET /api/favorites
///
/// # Errors
///
/// Returns `AppError::Database` if the lookup fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<FavoritesResponse>> {
    let favorites = favorites::list(state.pool(), &caller.user_id).await?;
    Ok(Json(FavoritesResponse { favorites }))
}

#[derive(Serialize)]
pub struct ToggleResponse {
    favorited: bool,
}

/// Add or remove a favorite.
///
/// POST /api/favorites/{product_id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product doesn't exist.
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ToggleResponse>> {
    let favorited = favorites::toggle(state.pool(), &caller.user_id, product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("product {product_id}")),
            other => other.into(),
        })?;
    Ok(Json(ToggleResponse { favorited }))
}
