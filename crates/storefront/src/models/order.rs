//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use marketplace_core::{AddressId, OrderId, OrderStatus, PaymentMethod, ProductId, StoreId, UserId};

use super::{Address, Product};

/// An order for the items of a single store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub address_id: AddressId,
    /// Subtotal less coupon discount plus any shipping, 2 dp.
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub is_coupon_used: bool,
    /// Coupon as it was at checkout time.
    pub coupon: Option<serde_json::Value>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, with the unit price copied at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

/// An order line with its product resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub product: Product,
}

/// An order with line items and shipping address resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItemView>,
    pub address: Address,
}
