//! Product rating types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_core::{OrderId, ProductId, RatingId, UserId};

/// A star rating left by a buyer for a product in one of their orders.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i16,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/ratings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub rating: i16,
    #[serde(default)]
    pub review: String,
}

impl NewRating {
    /// # Errors
    ///
    /// Returns a message if the rating is outside 1 to 5.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_string());
        }
        Ok(())
    }
}
