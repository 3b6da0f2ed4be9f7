//! Admin back-office handlers. Every handler requires `RequireAdmin`.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::{StoreId, StoreStatus};

use crate::db::users::UserRepository;
use crate::db::{coupons, orders, products, stores};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Coupon, NewCoupon, Store};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pending: i64,
    approved: i64,
    rejected: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    orders: i64,
    revenue: Decimal,
    products: i64,
    users: i64,
    stores: StoreCounts,
}

/// GET /api/admin/dashboard
///
/// # Errors
///
/// Returns `AppError::Database` if a query fails.
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<DashboardResponse>> {
    let pool = state.pool();
    let (orders, revenue) = orders::totals(pool, None).await?;
    let products = products::count(pool, None).await?;
    let users = UserRepository::new(pool).count().await?;
    let (pending, approved, rejected) = stores::count_by_status(pool).await?;

    Ok(Json(DashboardResponse {
        orders,
        revenue,
        products,
        users,
        stores: StoreCounts {
            pending,
            approved,
            rejected,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct StoresQuery {
    pub status: Option<StoreStatus>,
}

#[derive(Serialize)]
pub struct StoresResponse {
    stores: Vec<Store>,
}

/// GET /api/admin/stores?status=
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_stores(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<StoresQuery>,
) -> Result<Json<StoresResponse>> {
    let stores = stores::list_stores(state.pool(), query.status).await?;
    Ok(Json(StoresResponse { stores }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: StoreStatus,
}

#[derive(Serialize)]
pub struct StoreResponse {
    store: Store,
}

/// Approve or reject a store application.
///
/// POST /api/admin/stores/{id}/approve
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the status is `pending`, or
/// `AppError::Database(NotFound)` if the store doesn't exist.
#[instrument(skip_all, fields(store_id = %id))]
pub async fn review_store(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<StoreId>,
    payload: std::result::Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<StoreResponse>> {
    let Json(request) = payload?;
    if request.status == StoreStatus::Pending {
        return Err(AppError::BadRequest(
            "status must be approved or rejected".to_string(),
        ));
    }

    let store = stores::set_status(state.pool(), id, request.status).await?;
    tracing::info!(admin = %admin.email, status = %store.status, "Store reviewed");
    Ok(Json(StoreResponse { store }))
}

/// Flip whether an approved store is selling.
///
/// POST /api/admin/stores/{id}/toggle-active
///
/// # Errors
///
/// Returns `AppError::Database(NotFound)` if no approved store has this ID.
pub async fn toggle_store(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<StoreId>,
) -> Result<Json<StoreResponse>> {
    let store = stores::toggle_active(state.pool(), id).await?;
    Ok(Json(StoreResponse { store }))
}

#[derive(Serialize)]
pub struct CouponsResponse {
    coupons: Vec<Coupon>,
}

/// GET /api/admin/coupons
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_coupons(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<CouponsResponse>> {
    let coupons = coupons::list(state.pool()).await?;
    Ok(Json(CouponsResponse { coupons }))
}

#[derive(Serialize)]
pub struct CouponResponse {
    coupon: Coupon,
}

/// POST /api/admin/coupons
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an invalid coupon and
/// `AppError::Database(Conflict)` if the code exists.
pub async fn create_coupon(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    payload: std::result::Result<Json<NewCoupon>, JsonRejection>,
) -> Result<(StatusCode, Json<CouponResponse>)> {
    let Json(mut new_coupon) = payload?;
    new_coupon.validate().map_err(AppError::BadRequest)?;

    let coupon = coupons::create(state.pool(), &new_coupon).await?;
    Ok((StatusCode::CREATED, Json(CouponResponse { coupon })))
}

/// DELETE /api/admin/coupons/{code}
///
/// # Errors
///
/// Returns `AppError::Database(NotFound)` if no coupon has this code.
pub async fn delete_coupon(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    coupons::delete(state.pool(), &code).await?;
    Ok(StatusCode::NO_CONTENT)
}
