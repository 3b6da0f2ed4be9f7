//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and serialize as camelCase JSON, which is
//! what the browser and mobile clients consume.

pub mod address;
pub mod coupon;
pub mod order;
pub mod product;
pub mod rating;
pub mod store;
pub mod user;

pub use address::{Address, NewAddress};
pub use coupon::{Coupon, NewCoupon};
pub use order::{Order, OrderItem, OrderItemView, OrderView};
pub use product::{NewProduct, Product, ProductListing};
pub use rating::{NewRating, Rating};
pub use store::{NewStore, Store, StoreSummary};
pub use user::User;

/// Reject blank strings, naming the field in the message.
pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}
