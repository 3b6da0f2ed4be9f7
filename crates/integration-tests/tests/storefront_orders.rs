//! Integration tests for order persistence, cancellation and rating
//! eligibility, driven through the storefront repositories.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`mp-cli migrate`)
//!
//! Run with: cargo test -p marketplace-integration-tests -- --ignored

use marketplace_core::{AddressId, OrderId, PaymentMethod, ProductId, UserId};
use marketplace_integration_tests::TestContext;
use marketplace_storefront::db::orders::{self, NewOrder, NewOrderItem};
use marketplace_storefront::db::products;
use rust_decimal::Decimal;

/// Place an order for `quantity` units the way checkout does, returning its ID
/// and the units actually taken from stock.
async fn place(
    ctx: &TestContext,
    user_id: &UserId,
    address_id: AddressId,
    product_id: ProductId,
    quantity: i32,
    payment_method: PaymentMethod,
) -> (OrderId, i32) {
    let store_id = ctx.store_of(product_id).await;
    let mut tx = ctx.pool.begin().await.expect("Failed to begin");

    let order_id = orders::insert_order(
        &mut *tx,
        &NewOrder {
            user_id,
            store_id,
            address_id,
            total: Decimal::from(10 * quantity),
            payment_method,
            coupon: None,
        },
    )
    .await
    .expect("Failed to insert order");

    let reserved = products::decrement_stock(&mut *tx, product_id, quantity)
        .await
        .expect("Failed to decrement stock");
    orders::insert_items(
        &mut *tx,
        order_id,
        &[NewOrderItem {
            product_id,
            quantity,
            reserved_quantity: reserved,
            price: Decimal::from(10),
        }],
    )
    .await
    .expect("Failed to insert items");

    tx.commit().await.expect("Failed to commit");
    (order_id, reserved)
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_cancel_restores_only_reserved_stock() {
    let ctx = TestContext::new().await;
    let product_id = ctx.seed_product(Decimal::from(10), Decimal::from(10), 3).await;
    let (user_id, address_id) = ctx.seed_buyer().await;

    let (order_id, reserved) = place(
        &ctx,
        &user_id,
        address_id,
        product_id,
        10,
        PaymentMethod::Stripe,
    )
    .await;
    assert_eq!(reserved, 3);
    assert_eq!(ctx.stock_of(product_id).await, 0);

    let cancelled = orders::cancel_unpaid(&ctx.pool, &[order_id])
        .await
        .expect("Failed to cancel");
    assert_eq!(cancelled, 1);
    assert_eq!(ctx.stock_of(product_id).await, 3);
    assert!(ctx.orders_with_product(product_id).await.is_empty());
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_cancel_leaves_paid_orders_alone() {
    let ctx = TestContext::new().await;
    let product_id = ctx.seed_product(Decimal::from(10), Decimal::from(10), 5).await;
    let (user_id, address_id) = ctx.seed_buyer().await;

    let (order_id, _) = place(
        &ctx,
        &user_id,
        address_id,
        product_id,
        2,
        PaymentMethod::Stripe,
    )
    .await;
    let paid = orders::mark_paid(&ctx.pool, &[order_id], &user_id)
        .await
        .expect("Failed to mark paid");
    assert_eq!(paid, 1);

    let cancelled = orders::cancel_unpaid(&ctx.pool, &[order_id])
        .await
        .expect("Failed to cancel");
    assert_eq!(cancelled, 0);
    assert_eq!(ctx.stock_of(product_id).await, 3);
}

// ============================================================================
// Rating eligibility
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_unpaid_hosted_order_is_not_rateable_until_paid() {
    let ctx = TestContext::new().await;
    let product_id = ctx.seed_product(Decimal::from(10), Decimal::from(10), 5).await;
    let (user_id, address_id) = ctx.seed_buyer().await;

    let (order_id, _) = place(
        &ctx,
        &user_id,
        address_id,
        product_id,
        1,
        PaymentMethod::Stripe,
    )
    .await;
    let rateable = orders::contains_product(&ctx.pool, &user_id, order_id, product_id)
        .await
        .expect("Query failed");
    assert!(!rateable);

    orders::mark_paid(&ctx.pool, &[order_id], &user_id)
        .await
        .expect("Failed to mark paid");
    let rateable = orders::contains_product(&ctx.pool, &user_id, order_id, product_id)
        .await
        .expect("Query failed");
    assert!(rateable);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_cod_order_is_rateable_only_by_its_buyer() {
    let ctx = TestContext::new().await;
    let product_id = ctx.seed_product(Decimal::from(10), Decimal::from(10), 5).await;
    let (user_id, address_id) = ctx.seed_buyer().await;
    let (stranger, _) = ctx.seed_buyer().await;

    let (order_id, _) = place(&ctx, &user_id, address_id, product_id, 1, PaymentMethod::Cod).await;

    assert!(
        orders::contains_product(&ctx.pool, &user_id, order_id, product_id)
            .await
            .expect("Query failed")
    );
    assert!(
        !orders::contains_product(&ctx.pool, &stranger, order_id, product_id)
            .await
            .expect("Query failed")
    );
}
