//! Product catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{ProductId, StoreId};

use super::require_non_blank;

/// A product listed by a store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub description: String,
    /// List price shown struck-through next to `price`.
    pub mrp: Decimal,
    /// Authoritative selling price.
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: String,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its aggregated rating, as shown in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    /// Mean star rating, 0 when unrated.
    pub average_rating: Decimal,
    pub rating_count: i64,
}

/// Body of `POST /api/store/products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mrp: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub stock_quantity: i32,
}

impl NewProduct {
    /// # Errors
    ///
    /// Returns a message if a required field is blank, a price is negative,
    /// the price exceeds the MRP, or stock is negative.
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("name", &self.name)?;
        require_non_blank("category", &self.category)?;
        if self.price.is_sign_negative() || self.mrp.is_sign_negative() {
            return Err("prices must not be negative".to_string());
        }
        if self.price > self.mrp {
            return Err("price must not exceed mrp".to_string());
        }
        if self.stock_quantity < 0 {
            return Err("stockQuantity must not be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(price: i64, mrp: i64) -> NewProduct {
        NewProduct {
            name: "Mango".to_string(),
            description: String::new(),
            mrp: Decimal::from(mrp),
            price: Decimal::from(price),
            images: vec![],
            category: "fruit".to_string(),
            stock_quantity: 10,
        }
    }

    #[test]
    fn test_validate_price_not_above_mrp() {
        assert!(new_product(40, 50).validate().is_ok());
        assert!(new_product(60, 50).validate().is_err());
    }

    #[test]
    fn test_validate_negative_stock() {
        let mut product = new_product(10, 10);
        product.stock_quantity = -1;
        assert!(product.validate().is_err());
    }
}
