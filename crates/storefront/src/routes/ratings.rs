//! Product rating handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::{RepositoryError, orders, ratings};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{NewRating, Rating};
use crate::state::AppState;

#[derive(Serialize)]
pub struct RatingsResponse {
    ratings: Vec<Rating>,
}

/// GET /api/ratings
///
/// # Errors
///
/// Returns `AppError::Database` if the lookup fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<RatingsResponse>> {
    let ratings = ratings::list_for_user(state.pool(), &caller.user_id).await?;
    Ok(Json(RatingsResponse { ratings }))
}

#[derive(Serialize)]
pub struct RatingResponse {
    rating: Rating,
}

/// Rate a product from one of the caller's orders.
///
/// POST /api/ratings
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an out-of-range rating,
/// `AppError::NotFound` if the order isn't the caller's or lacks the product,
/// and `AppError::Conflict` if it was already rated.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    payload: std::result::Result<Json<NewRating>, JsonRejection>,
) -> Result<(StatusCode, Json<RatingResponse>)> {
    let Json(new_rating) = payload?;
    new_rating.validate().map_err(AppError::BadRequest)?;

    if !orders::contains_product(
        state.pool(),
        &caller.user_id,
        new_rating.order_id,
        new_rating.product_id,
    )
    .await?
    {
        return Err(AppError::NotFound(
            "order not found or doesn't contain this product".to_string(),
        ));
    }

    let rating = ratings::create(state.pool(), &caller.user_id, &new_rating)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("You already rated this product for this order".to_string())
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(RatingResponse { rating })))
}
