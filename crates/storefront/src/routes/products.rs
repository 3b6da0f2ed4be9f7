//! Public catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use marketplace_core::ProductId;

use crate::db::products::{self, ProductFilter};
use crate::db::{ratings, stores};
use crate::error::{AppError, Result};
use crate::models::{ProductListing, Rating, StoreSummary};
use crate::state::AppState;

/// Query parameters for product listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ProductsResponse {
    products: Vec<ProductListing>,
}

/// Products in stock from stores that are selling.
///
/// GET /api/products?category=&q=&limit=
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductsResponse>> {
    let filter = ProductFilter {
        category: query.category.filter(|c| !c.trim().is_empty()),
        query: query.q.filter(|q| !q.trim().is_empty()),
        limit: query.limit,
    };
    let products = products::list_public(state.pool(), &filter).await?;
    Ok(Json(ProductsResponse { products }))
}

/// Product detail with its store and reviews.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    product: ProductListing,
    store: Option<StoreSummary>,
    ratings: Vec<Rating>,
}

/// GET /api/products/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product doesn't exist or isn't listed.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let product = products::get_public(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let store = stores::get_summary(state.pool(), product.product.store_id).await?;
    let ratings = ratings::list_for_product(state.pool(), id).await?;

    Ok(Json(ProductDetail {
        product,
        store,
        ratings,
    }))
}
