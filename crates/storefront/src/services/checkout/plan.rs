//! Pure checkout planning: request validation, coupon eligibility, store
//! grouping and pricing.
//!
//! Nothing here touches the database, so every pricing rule is unit tested
//! against plain values.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use marketplace_core::{
    AddressId, PaymentMethod, ProductId, StoreId, percent_of, round_currency, to_minor_units,
};

use super::error::CheckoutError;
use crate::models::{Coupon, Product};
use crate::payments::SessionLineItem;

/// Maximum length of an `Idempotency-Key` header value.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// One requested line. Any client-sent price is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub id: ProductId,
    pub quantity: i32,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// A request that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
    /// Duplicates merged, in first-seen order.
    pub items: Vec<CheckoutItem>,
    /// Trimmed, `None` when blank.
    pub coupon_code: Option<String>,
}

impl CheckoutRequest {
    /// Check required fields and merge duplicate product lines.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidRequest` if the address or payment
    /// method is missing, there are no items, or a quantity isn't positive.
    pub fn validate(self) -> Result<ValidCheckout, CheckoutError> {
        let address_id = self
            .address_id
            .ok_or_else(|| CheckoutError::InvalidRequest("addressId is required".to_string()))?;
        let payment_method = self.payment_method.ok_or_else(|| {
            CheckoutError::InvalidRequest("paymentMethod is required".to_string())
        })?;
        if self.items.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "items must not be empty".to_string(),
            ));
        }

        let mut items: Vec<CheckoutItem> = Vec::with_capacity(self.items.len());
        for item in self.items {
            if item.quantity <= 0 {
                return Err(CheckoutError::InvalidRequest(format!(
                    "quantity for {} must be positive",
                    item.id
                )));
            }
            if let Some(existing) = items.iter_mut().find(|i| i.id == item.id) {
                existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(
                    || CheckoutError::InvalidRequest(format!("quantity for {} is too large", item.id)),
                )?;
            } else {
                items.push(item);
            }
        }

        let coupon_code = self
            .coupon_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(ValidCheckout {
            address_id,
            payment_method,
            items,
            coupon_code,
        })
    }
}

/// Validate an `Idempotency-Key` header value.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidRequest` if the key is blank or too long.
pub fn validate_idempotency_key(key: &str) -> Result<&str, CheckoutError> {
    let key = key.trim();
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(CheckoutError::InvalidRequest(format!(
            "Idempotency-Key must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(key)
}

/// Decide whether the caller may use the coupon looked up for their code.
///
/// # Errors
///
/// Returns `CouponNotFound` when no active coupon matched, or
/// `CouponNotEligible` when a new-user or member restriction applies.
pub fn resolve_coupon(
    found: Option<Coupon>,
    prior_orders: i64,
    is_member: bool,
) -> Result<Coupon, CheckoutError> {
    let coupon = found.ok_or(CheckoutError::CouponNotFound)?;
    check_first_order(&coupon, prior_orders)?;
    if coupon.for_member && !is_member {
        return Err(CheckoutError::CouponNotEligible(
            "coupon is only valid for members",
        ));
    }
    Ok(coupon)
}

/// Reject a new-user coupon once the caller has any order.
///
/// # Errors
///
/// Returns `CouponNotEligible` for a new-user coupon with prior orders.
pub fn check_first_order(coupon: &Coupon, prior_orders: i64) -> Result<(), CheckoutError> {
    if coupon.for_new_user && prior_orders > 0 {
        return Err(CheckoutError::CouponNotEligible(
            "coupon is only valid for a first order",
        ));
    }
    Ok(())
}

/// A line priced from the locked catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// All lines that belong to one store, and so to one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreGroup {
    pub store_id: StoreId,
    pub lines: Vec<PlannedLine>,
}

/// Group lines by owning store, in order of first appearance.
///
/// # Errors
///
/// Returns `CheckoutError::ProductNotFound` naming the first unknown product.
pub fn group_by_store(
    items: &[CheckoutItem],
    catalog: &HashMap<ProductId, Product>,
) -> Result<Vec<StoreGroup>, CheckoutError> {
    let mut groups: Vec<StoreGroup> = Vec::new();
    for item in items {
        let product = catalog
            .get(&item.id)
            .ok_or(CheckoutError::ProductNotFound(item.id))?;
        let line = PlannedLine {
            product_id: product.id,
            name: product.name.clone(),
            image: product.images.first().cloned(),
            quantity: item.quantity,
            unit_price: product.price,
        };
        match groups.iter_mut().find(|g| g.store_id == product.store_id) {
            Some(group) => group.lines.push(line),
            None => groups.push(StoreGroup {
                store_id: product.store_id,
                lines: vec![line],
            }),
        }
    }
    Ok(groups)
}

/// A store group with its computed order total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub group: StoreGroup,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    /// `subtotal - discount + shipping`, rounded to cents.
    pub total: Decimal,
}

/// Price each store group.
///
/// The coupon applies to every group's subtotal. Non-members pay the shipping
/// fee once per checkout, on the first group.
#[must_use]
pub fn price_orders(
    groups: Vec<StoreGroup>,
    coupon: Option<&Coupon>,
    is_member: bool,
    shipping_fee: Decimal,
) -> Vec<PricedOrder> {
    let mut shipping_pending = !is_member;
    groups
        .into_iter()
        .map(|group| {
            let subtotal: Decimal = group
                .lines
                .iter()
                .map(|l| l.unit_price * Decimal::from(l.quantity))
                .sum();
            let discount = coupon.map_or(Decimal::ZERO, |c| percent_of(subtotal, c.discount));
            let shipping = if shipping_pending {
                shipping_pending = false;
                shipping_fee
            } else {
                Decimal::ZERO
            };
            PricedOrder {
                total: round_currency(subtotal - discount + shipping),
                group,
                subtotal,
                discount,
                shipping,
            }
        })
        .collect()
}

/// Line items for a hosted checkout session.
///
/// Each order line is charged as one item whose amount is the discounted line
/// total in cents. Per-line rounding can drift from the order total, so the
/// order's largest line absorbs the difference. A single "Shipping" line is
/// added when any order was charged shipping. The session therefore charges
/// exactly the sum of the persisted order totals.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidRequest` if an amount doesn't fit in minor units.
pub fn session_line_items(
    orders: &[PricedOrder],
    coupon: Option<&Coupon>,
) -> Result<Vec<SessionLineItem>, CheckoutError> {
    let too_large = || CheckoutError::InvalidRequest("amount too large".to_string());

    let mut items = Vec::new();
    let mut shipping_cents = 0_i64;
    for order in orders {
        let order_shipping = to_minor_units(order.shipping).ok_or_else(too_large)?;
        let target = to_minor_units(order.total).ok_or_else(too_large)? - order_shipping;
        shipping_cents += order_shipping;

        let first = items.len();
        let mut charged = 0_i64;
        for line in &order.group.lines {
            let gross = line.unit_price * Decimal::from(line.quantity);
            let net = coupon.map_or(gross, |c| gross - percent_of(gross, c.discount));
            let amount = to_minor_units(net).ok_or_else(too_large)?;
            charged += amount;
            items.push(SessionLineItem {
                name: line_label(line),
                image: line.image.clone(),
                unit_amount: amount,
                quantity: 1,
            });
        }

        if let Some(largest) = items[first..].iter_mut().max_by_key(|i| i.unit_amount) {
            largest.unit_amount += target - charged;
        }
    }

    if shipping_cents > 0 {
        items.push(SessionLineItem {
            name: "Shipping".to_string(),
            image: None,
            unit_amount: shipping_cents,
            quantity: 1,
        });
    }

    Ok(items)
}

/// Display name for a line charged as a single item.
fn line_label(line: &PlannedLine) -> String {
    if line.quantity == 1 {
        line.name.clone()
    } else {
        format!("{} x {}", line.name, line.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn product(store_id: StoreId, price: Decimal) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            store_id,
            name: "Ceramic mug".to_string(),
            description: String::new(),
            mrp: price,
            price,
            images: vec!["https://cdn.example.com/mug.jpg".to_string()],
            category: "Kitchen".to_string(),
            stock_quantity: 10,
            created_at: now,
            updated_at: now,
        }
    }

    fn coupon(discount: i64, for_new_user: bool, for_member: bool) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: "NEW20".to_string(),
            description: String::new(),
            discount: Decimal::from(discount),
            for_new_user,
            for_member,
            is_public: true,
            expires_at: now + Duration::days(7),
            created_at: now,
        }
    }

    fn catalog(products: &[&Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    fn request(items: Vec<CheckoutItem>) -> CheckoutRequest {
        CheckoutRequest {
            address_id: Some(AddressId::generate()),
            payment_method: Some(PaymentMethod::Cod),
            items,
            coupon_code: None,
        }
    }

    #[test]
    fn test_validate_requires_address_and_method() {
        let mut req = request(vec![CheckoutItem {
            id: ProductId::generate(),
            quantity: 1,
        }]);
        req.address_id = None;
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));

        let mut req = request(vec![CheckoutItem {
            id: ProductId::generate(),
            quantity: 1,
        }]);
        req.payment_method = None;
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_rejects_empty_and_non_positive() {
        assert!(matches!(
            request(vec![]).validate(),
            Err(CheckoutError::InvalidRequest(_))
        ));
        let req = request(vec![CheckoutItem {
            id: ProductId::generate(),
            quantity: 0,
        }]);
        assert!(matches!(req.validate(), Err(CheckoutError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_merges_duplicates_in_first_seen_order() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let mut req = request(vec![
            CheckoutItem { id: a, quantity: 1 },
            CheckoutItem { id: b, quantity: 2 },
            CheckoutItem { id: a, quantity: 3 },
        ]);
        req.coupon_code = Some("  ".to_string());
        let valid = req.validate().unwrap();
        assert_eq!(
            valid.items,
            vec![
                CheckoutItem { id: a, quantity: 4 },
                CheckoutItem { id: b, quantity: 2 },
            ]
        );
        assert_eq!(valid.coupon_code, None);
    }

    #[test]
    fn test_request_ignores_client_price() {
        let json = r#"{
            "addressId": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "paymentMethod": "STRIPE",
            "items": [{"id": "1b4e28ba-2fa1-11d2-883f-0016d3cca428", "quantity": 2, "price": 0.01}],
            "couponCode": "new20"
        }"#;
        let req: CheckoutRequest = serde_json::from_str(json).unwrap();
        let valid = req.validate().unwrap();
        assert_eq!(valid.payment_method, PaymentMethod::Stripe);
        assert_eq!(valid.items[0].quantity, 2);
        assert_eq!(valid.coupon_code.as_deref(), Some("new20"));
    }

    #[test]
    fn test_idempotency_key_bounds() {
        assert_eq!(validate_idempotency_key(" abc ").unwrap(), "abc");
        assert!(validate_idempotency_key("").is_err());
        assert!(validate_idempotency_key(&"k".repeat(256)).is_err());
    }

    #[test]
    fn test_resolve_coupon_rules() {
        assert!(matches!(
            resolve_coupon(None, 0, false),
            Err(CheckoutError::CouponNotFound)
        ));
        assert!(matches!(
            resolve_coupon(Some(coupon(20, true, false)), 1, false),
            Err(CheckoutError::CouponNotEligible(_))
        ));
        assert!(matches!(
            resolve_coupon(Some(coupon(20, false, true)), 0, false),
            Err(CheckoutError::CouponNotEligible(_))
        ));
        assert!(resolve_coupon(Some(coupon(20, true, true)), 0, true).is_ok());
    }

    #[test]
    fn test_first_order_recheck() {
        assert!(check_first_order(&coupon(20, true, false), 0).is_ok());
        assert!(matches!(
            check_first_order(&coupon(20, true, false), 1),
            Err(CheckoutError::CouponNotEligible(_))
        ));
        assert!(check_first_order(&coupon(20, false, false), 3).is_ok());
    }

    #[test]
    fn test_group_by_store_reports_unknown_product() {
        let missing = ProductId::generate();
        let err = group_by_store(
            &[CheckoutItem {
                id: missing,
                quantity: 1,
            }],
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == missing));
    }

    #[test]
    fn test_new_user_coupon_with_shipping() {
        // 2 x 50.00, 20% off, 5.00 shipping
        let p1 = product(StoreId::generate(), Decimal::from(50));
        let groups = group_by_store(
            &[CheckoutItem {
                id: p1.id,
                quantity: 2,
            }],
            &catalog(&[&p1]),
        )
        .unwrap();
        let c = coupon(20, true, false);
        let priced = price_orders(groups, Some(&c), false, Decimal::from(5));
        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].total, Decimal::from(85));
    }

    #[test]
    fn test_member_skips_shipping() {
        let p1 = product(StoreId::generate(), Decimal::from(50));
        let groups = group_by_store(
            &[CheckoutItem {
                id: p1.id,
                quantity: 2,
            }],
            &catalog(&[&p1]),
        )
        .unwrap();
        let c = coupon(20, true, false);
        let priced = price_orders(groups, Some(&c), true, Decimal::from(5));
        assert_eq!(priced[0].total, Decimal::from(80));
    }

    #[test]
    fn test_two_stores_pay_shipping_once() {
        let store_a = StoreId::generate();
        let store_b = StoreId::generate();
        let p1 = product(store_a, Decimal::from(10));
        let p2 = product(store_b, Decimal::from(20));
        let groups = group_by_store(
            &[
                CheckoutItem {
                    id: p1.id,
                    quantity: 1,
                },
                CheckoutItem {
                    id: p2.id,
                    quantity: 1,
                },
            ],
            &catalog(&[&p1, &p2]),
        )
        .unwrap();
        let priced = price_orders(groups, None, false, Decimal::from(5));
        assert_eq!(priced.len(), 2);
        assert_eq!(priced[0].group.store_id, store_a);
        assert_eq!(priced[0].total, Decimal::from(15));
        assert_eq!(priced[1].total, Decimal::from(20));
    }

    #[test]
    fn test_total_rounds_to_cents() {
        // 3 x 19.99 = 59.97, 15% off = 8.9955, +5 shipping = 55.9745
        let p = product(StoreId::generate(), Decimal::new(1999, 2));
        let groups = group_by_store(
            &[CheckoutItem {
                id: p.id,
                quantity: 3,
            }],
            &catalog(&[&p]),
        )
        .unwrap();
        let c = coupon(15, false, false);
        let priced = price_orders(groups, Some(&c), false, Decimal::from(5));
        assert_eq!(priced[0].total, Decimal::new(5597, 2));
    }

    #[test]
    fn test_session_line_items_discount_and_shipping() {
        let p1 = product(StoreId::generate(), Decimal::from(50));
        let groups = group_by_store(
            &[CheckoutItem {
                id: p1.id,
                quantity: 2,
            }],
            &catalog(&[&p1]),
        )
        .unwrap();
        let c = coupon(20, false, false);
        let priced = price_orders(groups, Some(&c), false, Decimal::from(5));
        let items = session_line_items(&priced, Some(&c)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Ceramic mug x 2");
        assert_eq!(items[0].unit_amount, 8000);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(
            items[0].image.as_deref(),
            Some("https://cdn.example.com/mug.jpg")
        );
        assert_eq!(items[1].name, "Shipping");
        assert_eq!(items[1].unit_amount, 500);
    }

    fn charged(items: &[SessionLineItem]) -> i64 {
        items
            .iter()
            .map(|i| i.unit_amount * i64::from(i.quantity))
            .sum()
    }

    #[test]
    fn test_session_charges_order_total_for_bulk_quantity() {
        // 100 x 19.99 = 1999.00, 15% off = 1699.15
        let p = product(StoreId::generate(), Decimal::new(1999, 2));
        let groups = group_by_store(
            &[CheckoutItem {
                id: p.id,
                quantity: 100,
            }],
            &catalog(&[&p]),
        )
        .unwrap();
        let c = coupon(15, false, false);
        let priced = price_orders(groups, Some(&c), true, Decimal::from(5));
        let items = session_line_items(&priced, Some(&c)).unwrap();
        assert_eq!(to_minor_units(priced[0].total), Some(169_915));
        assert_eq!(charged(&items), 169_915);
    }

    #[test]
    fn test_session_charges_sum_of_totals_across_stores() {
        // Per-line rounding of 0.335 and 0.665 each drifts by half a cent
        let store_a = StoreId::generate();
        let store_b = StoreId::generate();
        let p1 = product(store_a, Decimal::new(67, 2));
        let p2 = product(store_a, Decimal::new(133, 2));
        let p3 = product(store_b, Decimal::new(1999, 2));
        let groups = group_by_store(
            &[
                CheckoutItem { id: p1.id, quantity: 1 },
                CheckoutItem { id: p2.id, quantity: 1 },
                CheckoutItem { id: p3.id, quantity: 7 },
            ],
            &catalog(&[&p1, &p2, &p3]),
        )
        .unwrap();
        let c = coupon(50, false, false);
        let priced = price_orders(groups, Some(&c), false, Decimal::new(499, 2));
        let items = session_line_items(&priced, Some(&c)).unwrap();

        let expected: i64 = priced
            .iter()
            .map(|o| to_minor_units(o.total).unwrap())
            .sum();
        assert_eq!(charged(&items), expected);
        assert_eq!(items.last().unwrap().unit_amount, 499);
        assert!(items.iter().all(|i| i.unit_amount >= 0));
    }

    #[test]
    fn test_session_line_items_member_has_no_shipping_line() {
        let p1 = product(StoreId::generate(), Decimal::from(50));
        let groups = group_by_store(
            &[CheckoutItem {
                id: p1.id,
                quantity: 1,
            }],
            &catalog(&[&p1]),
        )
        .unwrap();
        let priced = price_orders(groups, None, true, Decimal::from(5));
        let items = session_line_items(&priced, None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_amount, 5000);
    }
}
