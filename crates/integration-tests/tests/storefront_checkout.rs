//! Integration tests for cash-on-delivery checkout.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`mp-cli migrate`)
//! - The storefront server running (`cargo run -p marketplace-storefront`)
//! - `TEST_CUSTOMER_TOKEN` for a customer without a membership
//! - `CHECKOUT_SHIPPING_FEE` matching the server's, if not the default
//!
//! Run with: cargo test -p marketplace-integration-tests -- --ignored

use marketplace_integration_tests::TestContext;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

fn shipping_fee() -> Decimal {
    std::env::var("CHECKOUT_SHIPPING_FEE")
        .ok()
        .and_then(|fee| fee.parse().ok())
        .unwrap_or_else(|| Decimal::from(5))
}

/// Create an address for the test customer and return its id.
async fn create_address(ctx: &TestContext) -> String {
    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/addresses")))
        .json(&json!({
            "name": "Test Customer",
            "email": "customer@example.com",
            "street": "1 Test Street",
            "city": "Springfield",
            "state": "OR",
            "zip": "97477",
            "country": "US",
            "phone": "+1 555 0100",
        }))
        .send()
        .await
        .expect("Failed to create address");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("Invalid address response");
    body["address"]["id"]
        .as_str()
        .expect("address id")
        .to_string()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_requires_token() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&json!({ "items": [] }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Cash on Delivery
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_cod_checkout_decrements_stock_and_clears_cart() {
    let ctx = TestContext::new().await;
    let product_id = ctx
        .seed_product(Decimal::new(1250, 2), Decimal::new(1500, 2), 10)
        .await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.put(ctx.url("/api/cart")))
        .json(&json!({ "cart": { product_id.to_string(): 3 } }))
        .send()
        .await
        .expect("Failed to fill cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "items": [
                { "id": product_id.to_string(), "quantity": 2 },
                { "id": product_id.to_string(), "quantity": 1 },
            ],
        }))
        .send()
        .await
        .expect("Checkout failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid checkout response");
    assert_eq!(body["message"], "Orders Placed Successfully");

    assert_eq!(ctx.stock_of(product_id).await, 7);

    let cart: Value = ctx
        .as_customer(ctx.client.get(ctx.url("/api/cart")))
        .send()
        .await
        .expect("Failed to read cart")
        .json()
        .await
        .expect("Invalid cart response");
    assert_eq!(cart["cart"], json!({}));

    let orders: Value = ctx
        .as_customer(ctx.client.get(ctx.url("/api/orders")))
        .send()
        .await
        .expect("Failed to list orders")
        .json()
        .await
        .expect("Invalid orders response");
    let placed = orders["orders"]
        .as_array()
        .expect("orders array")
        .iter()
        .find(|order| {
            order["orderItems"]
                .as_array()
                .is_some_and(|items| items.iter().any(|i| i["productId"] == product_id.to_string()))
        })
        .expect("new order listed");
    assert_eq!(placed["paymentMethod"], "COD");
    assert_eq!(placed["isPaid"], false);
    assert_eq!(placed["status"], "ORDER_PLACED");
    assert_eq!(placed["orderItems"][0]["quantity"], 3);
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_stock_is_floored_at_zero() {
    let ctx = TestContext::new().await;
    let product_id = ctx
        .seed_product(Decimal::from(2), Decimal::from(2), 3)
        .await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "items": [{ "id": product_id.to_string(), "quantity": 10 }],
        }))
        .send()
        .await
        .expect("Checkout failed");
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(ctx.stock_of(product_id).await, 0);
    let placed = ctx.orders_with_product(product_id).await;
    assert_eq!(placed.len(), 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_one_order_per_store_with_shipping_once() {
    let ctx = TestContext::new().await;
    let mug = ctx
        .seed_product(Decimal::from(10), Decimal::from(10), 5)
        .await;
    let lamp = ctx
        .seed_product(Decimal::from(20), Decimal::from(20), 5)
        .await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "items": [
                { "id": mug.to_string(), "quantity": 1 },
                { "id": lamp.to_string(), "quantity": 1 },
            ],
        }))
        .send()
        .await
        .expect("Checkout failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let mug_orders = ctx.orders_with_product(mug).await;
    let lamp_orders = ctx.orders_with_product(lamp).await;
    assert_eq!(mug_orders.len(), 1);
    assert_eq!(lamp_orders.len(), 1);
    assert_ne!(mug_orders[0].id, lamp_orders[0].id);
    assert_eq!(mug_orders[0].product_ids, vec![mug.as_uuid()]);
    assert_eq!(lamp_orders[0].product_ids, vec![lamp.as_uuid()]);

    // The first store in the request carries the fee
    assert_eq!(mug_orders[0].total, Decimal::from(10) + shipping_fee());
    assert_eq!(lamp_orders[0].total, Decimal::from(20));
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_unknown_product_rolls_back_other_stores() {
    let ctx = TestContext::new().await;
    let product_id = ctx
        .seed_product(Decimal::from(10), Decimal::from(10), 5)
        .await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "items": [
                { "id": product_id.to_string(), "quantity": 2 },
                { "id": Uuid::new_v4().to_string(), "quantity": 1 },
            ],
        }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(ctx.stock_of(product_id).await, 5);
    assert!(ctx.orders_with_product(product_id).await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_empty_items_are_rejected() {
    let ctx = TestContext::new().await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "items": [],
        }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_unknown_product_is_rejected_without_side_effects() {
    let ctx = TestContext::new().await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "items": [{ "id": Uuid::new_v4().to_string(), "quantity": 1 }],
        }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert_eq!(body["code"], "product_not_found");
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_unknown_coupon_is_rejected() {
    let ctx = TestContext::new().await;
    let product_id = ctx
        .seed_product(Decimal::new(500, 2), Decimal::new(500, 2), 5)
        .await;
    let address_id = create_address(&ctx).await;

    let resp = ctx
        .as_customer(ctx.client.post(ctx.url("/api/orders")))
        .json(&json!({
            "addressId": address_id,
            "paymentMethod": "COD",
            "couponCode": format!("NOPE{}", Uuid::new_v4().simple()),
            "items": [{ "id": product_id.to_string(), "quantity": 1 }],
        }))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid error body");
    assert_eq!(body["code"], "coupon_not_found");
    assert_eq!(ctx.stock_of(product_id).await, 5);
}

// ============================================================================
// Idempotency
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider token"]
async fn test_idempotency_key_replays_first_response() {
    let ctx = TestContext::new().await;
    let product_id = ctx
        .seed_product(Decimal::new(800, 2), Decimal::new(1000, 2), 4)
        .await;
    let address_id = create_address(&ctx).await;
    let key = Uuid::new_v4().to_string();
    let request = json!({
        "addressId": address_id,
        "paymentMethod": "COD",
        "items": [{ "id": product_id.to_string(), "quantity": 1 }],
    });

    for _ in 0..2 {
        let resp = ctx
            .as_customer(ctx.client.post(ctx.url("/api/orders")))
            .header("Idempotency-Key", &key)
            .json(&request)
            .send()
            .await
            .expect("Checkout failed");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("Invalid checkout response");
        assert_eq!(body["message"], "Orders Placed Successfully");
    }

    // Only the first request placed an order
    assert_eq!(ctx.stock_of(product_id).await, 3);
}
