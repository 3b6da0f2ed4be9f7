//! Customer-side coupon check.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{coupons, orders};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Coupon;
use crate::services::checkout::plan::resolve_coupon;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct CouponResponse {
    coupon: Coupon,
}

/// Check a coupon code with the same rules checkout applies.
///
/// POST /api/coupons/verify
///
/// # Errors
///
/// Returns `AppError::Checkout` with `CouponNotFound` or `CouponNotEligible`.
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<CouponResponse>> {
    let Json(request) = payload?;

    let found = coupons::find_active(state.pool(), &request.code, Utc::now()).await?;
    let prior_orders = orders::count_for_user(state.pool(), &caller.user_id).await?;
    let is_member = caller.has_plan(&state.config().identity.membership_plan);

    let coupon = resolve_coupon(found, prior_orders, is_member)?;
    Ok(Json(CouponResponse { coupon }))
}
