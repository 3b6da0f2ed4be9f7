//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `checkout` - Multi-store order placement, coupon rules and payment dispatch

pub mod checkout;
