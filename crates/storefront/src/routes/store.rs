//! Seller store handlers.
//!
//! Applying for a store and checking its status only needs authentication;
//! everything else requires a store that is approved and active.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketplace_core::{OrderId, OrderStatus, ProductId, StoreStatus};

use crate::db::{orders, products, ratings, stores};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, RequireSeller};
use crate::models::{NewProduct, NewStore, Order, OrderView, Product, Rating, Store};
use crate::state::AppState;

#[derive(Serialize)]
pub struct StoreResponse {
    store: Store,
}

/// Apply for a store. It starts out pending admin approval.
///
/// POST /api/store
///
/// # Errors
///
/// Returns `AppError::BadRequest` for invalid input and `AppError::Conflict`
/// if the caller already has a store or the username is taken.
#[instrument(skip_all)]
pub async fn apply(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    payload: std::result::Result<Json<NewStore>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreResponse>)> {
    let Json(mut application) = payload?;
    let email = application.validate().map_err(AppError::BadRequest)?;

    let store = stores::create_store(state.pool(), &caller.user_id, &application, &email).await?;
    tracing::info!(store_id = %store.id, username = %store.username, "Store application received");

    Ok((StatusCode::CREATED, Json(StoreResponse { store })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: StoreStatus,
    is_active: bool,
}

/// GET /api/store/status
///
/// # Errors
///
/// Returns `AppError::NotFound` if the caller has no store.
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<StatusResponse>> {
    let store = stores::get_by_owner(state.pool(), &caller.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("You don't have a store".to_string()))?;
    Ok(Json(StatusResponse {
        status: store.status,
        is_active: store.is_active,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    total_orders: i64,
    total_earnings: Decimal,
    total_products: i64,
    ratings: Vec<Rating>,
}

/// GET /api/store/dashboard
///
/// # Errors
///
/// Returns `AppError::Database` if a query fails.
pub async fn dashboard(
    State(state): State<AppState>,
    RequireSeller(_, store): RequireSeller,
) -> Result<Json<DashboardResponse>> {
    let (total_orders, total_earnings) = orders::totals(state.pool(), Some(store.id)).await?;
    let total_products = products::count(state.pool(), Some(store.id)).await?;
    let ratings = ratings::list_for_store(state.pool(), store.id).await?;

    Ok(Json(DashboardResponse {
        total_orders,
        total_earnings,
        total_products,
        ratings,
    }))
}

#[derive(Serialize)]
pub struct ProductsResponse {
    products: Vec<Product>,
}

/// GET /api/store/products
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_products(
    State(state): State<AppState>,
    RequireSeller(_, store): RequireSeller,
) -> Result<Json<ProductsResponse>> {
    let products = products::list_for_store(state.pool(), store.id).await?;
    Ok(Json(ProductsResponse { products }))
}

#[derive(Serialize)]
pub struct ProductResponse {
    product: Product,
}

/// POST /api/store/products
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the product is invalid.
#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    RequireSeller(_, store): RequireSeller,
    payload: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let Json(new_product) = payload?;
    new_product.validate().map_err(AppError::BadRequest)?;

    let product = products::create(state.pool(), store.id, &new_product).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse { product })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
    pub stock_quantity: i32,
}

/// Set the stock of one of the store's products.
///
/// POST /api/store/products/{id}/stock
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a negative quantity and
/// `AppError::Database(NotFound)` if the product isn't the store's.
pub async fn set_stock(
    State(state): State<AppState>,
    RequireSeller(_, store): RequireSeller,
    Path(id): Path<ProductId>,
    payload: std::result::Result<Json<StockRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>> {
    let Json(request) = payload?;
    if request.stock_quantity < 0 {
        return Err(AppError::BadRequest(
            "stockQuantity must not be negative".to_string(),
        ));
    }

    let product = products::set_stock(state.pool(), store.id, id, request.stock_quantity).await?;
    Ok(Json(ProductResponse { product }))
}

#[derive(Serialize)]
pub struct OrdersResponse {
    orders: Vec<OrderView>,
}

/// GET /api/store/orders
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_orders(
    State(state): State<AppState>,
    RequireSeller(_, store): RequireSeller,
) -> Result<Json<OrdersResponse>> {
    let orders = orders::list_for_store(state.pool(), store.id).await?;
    Ok(Json(OrdersResponse { orders }))
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct OrderResponse {
    order: Order,
}

/// POST /api/store/orders/{id}/status
///
/// # Errors
///
/// Returns `AppError::Database(NotFound)` if the order isn't the store's.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireSeller(_, store): RequireSeller,
    Path(id): Path<OrderId>,
    payload: std::result::Result<Json<OrderStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>> {
    let Json(request) = payload?;
    let order = orders::update_status(state.pool(), store.id, id, request.status).await?;
    Ok(Json(OrderResponse { order }))
}
