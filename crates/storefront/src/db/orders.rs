//! Order database operations.
//!
//! Orders are written only by checkout (inside its transaction) and updated by
//! sellers (status) and the payment webhook (paid / cancelled). Listings only
//! show orders that are pay-on-delivery or already paid.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::instrument;

use marketplace_core::{
    AddressId, OrderId, OrderStatus, PaymentMethod, ProductId, StoreId, UserId,
};

use super::RepositoryError;
use crate::models::{Address, Order, OrderItem, OrderItemView, OrderView, Product};

const ORDER_COLUMNS: &str = "id, user_id, store_id, address_id, total, payment_method, is_paid, \
                             is_coupon_used, coupon, status, created_at, updated_at";

/// Orders that count as placed: pay-on-delivery, or paid through hosted checkout.
const VISIBLE: &str = "(payment_method = 'COD' OR is_paid)";

/// Values for a new order row.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: &'a UserId,
    pub store_id: StoreId,
    pub address_id: AddressId,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub coupon: Option<serde_json::Value>,
}

/// Number of orders the user has ever placed, paid or not.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_for_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: &UserId,
) -> Result<i64, RepositoryError> {
    let count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM storefront."order" WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

/// Serialize checkouts of one user until the current transaction ends.
///
/// # Errors
///
/// Returns `sqlx::Error` so the checkout can surface the SQLSTATE.
pub async fn lock_user_checkouts(conn: &mut PgConnection, user_id: &UserId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Insert an order row and return its ID.
///
/// # Errors
///
/// Returns `sqlx::Error` so the checkout can surface the SQLSTATE.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<OrderId, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO storefront."order"
            (user_id, store_id, address_id, total, payment_method, is_coupon_used, coupon)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(order.user_id)
    .bind(order.store_id)
    .bind(order.address_id)
    .bind(order.total)
    .bind(order.payment_method)
    .bind(order.coupon.is_some())
    .bind(&order.coupon)
    .fetch_one(conn)
    .await
}

/// A line item to insert.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Units actually taken from stock, restored if the order is cancelled.
    pub reserved_quantity: i32,
    pub price: Decimal,
}

/// Insert the line items of an order.
///
/// # Errors
///
/// Returns `sqlx::Error` so the checkout can surface the SQLSTATE.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[NewOrderItem],
) -> Result<(), sqlx::Error> {
    let product_ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();
    let reserved: Vec<i32> = lines.iter().map(|l| l.reserved_quantity).collect();
    let prices: Vec<Decimal> = lines.iter().map(|l| l.price).collect();

    sqlx::query(
        r"
        INSERT INTO storefront.order_item (order_id, product_id, quantity, reserved_quantity, price)
        SELECT $1, product_id, quantity, reserved_quantity, price
        FROM UNNEST($2::uuid[], $3::int4[], $4::int4[], $5::numeric[])
            AS t(product_id, quantity, reserved_quantity, price)
        ",
    )
    .bind(order_id)
    .bind(&product_ids)
    .bind(&quantities)
    .bind(&reserved)
    .bind(&prices)
    .execute(conn)
    .await?;

    Ok(())
}

/// The caller's placed orders, newest first, with items and address resolved.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails, or
/// `RepositoryError::DataCorruption` if a referenced row is missing.
#[instrument(skip(pool), fields(user_id = %user_id))]
pub async fn list_for_user(pool: &PgPool, user_id: &UserId) -> Result<Vec<OrderView>, RepositoryError> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM storefront."order"
        WHERE user_id = $1 AND {VISIBLE}
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    resolve_views(pool, orders).await
}

/// A store's placed orders, newest first, with items and address resolved.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails, or
/// `RepositoryError::DataCorruption` if a referenced row is missing.
#[instrument(skip(pool), fields(store_id = %store_id))]
pub async fn list_for_store(pool: &PgPool, store_id: StoreId) -> Result<Vec<OrderView>, RepositoryError> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM storefront."order"
        WHERE store_id = $1 AND {VISIBLE}
        ORDER BY created_at DESC
        "#
    ))
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    resolve_views(pool, orders).await
}

/// Attach line items (with products) and addresses, preserving order.
async fn resolve_views(pool: &PgPool, orders: Vec<Order>) -> Result<Vec<OrderView>, RepositoryError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
    let mut address_ids: Vec<AddressId> = orders.iter().map(|o| o.address_id).collect();
    address_ids.sort_unstable();
    address_ids.dedup();

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT order_id, product_id, quantity, price FROM storefront.order_item WHERE order_id = ANY($1)",
    )
    .bind(&order_ids)
    .fetch_all(pool)
    .await?;

    let mut product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let products: HashMap<ProductId, Product> = super::products::get_many(pool, &product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let addresses: HashMap<AddressId, Address> = super::addresses::get_many(pool, &address_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let mut items_by_order: HashMap<OrderId, Vec<OrderItemView>> = HashMap::new();
    for item in items {
        let product = products.get(&item.product_id).cloned().ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order item references missing product {}", item.product_id))
        })?;
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemView {
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                product,
            });
    }

    orders
        .into_iter()
        .map(|order| {
            let address = addresses.get(&order.address_id).cloned().ok_or_else(|| {
                RepositoryError::DataCorruption(format!("order {} references missing address", order.id))
            })?;
            let order_items = items_by_order.remove(&order.id).unwrap_or_default();
            Ok(OrderView {
                order,
                order_items,
                address,
            })
        })
        .collect()
}

/// Update the fulfillment status of one of the store's orders.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't belong to the store.
#[instrument(skip(pool), fields(store_id = %store_id, order_id = %id, status = %status))]
pub async fn update_status(
    pool: &PgPool,
    store_id: StoreId,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE storefront."order"
        SET status = $3, updated_at = NOW()
        WHERE id = $1 AND store_id = $2
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(store_id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Mark the user's listed orders paid. Returns how many changed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_paid<'e>(
    executor: impl PgExecutor<'e>,
    ids: &[OrderId],
    user_id: &UserId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r#"
        UPDATE storefront."order"
        SET is_paid = TRUE, updated_at = NOW()
        WHERE id = ANY($1) AND user_id = $2 AND NOT is_paid
        "#,
    )
    .bind(ids)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Delete the listed unpaid orders and put the stock they took back.
///
/// Idempotency ledger entries that reference the orders are removed too, so
/// the same key can be retried. Paid orders are never touched.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the transaction fails.
#[instrument(skip(pool), fields(orders = ids.len()))]
pub async fn cancel_unpaid(pool: &PgPool, ids: &[OrderId]) -> Result<u64, RepositoryError> {
    let mut tx = pool.begin().await?;

    let doomed: Vec<OrderId> = sqlx::query_scalar(
        r#"
        SELECT id FROM storefront."order"
        WHERE id = ANY($1) AND NOT is_paid
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *tx)
    .await?;

    if doomed.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    sqlx::query(
        r"
        UPDATE storefront.product p
        SET stock_quantity = p.stock_quantity + s.quantity, updated_at = NOW()
        FROM (
            SELECT product_id, SUM(reserved_quantity)::int4 AS quantity
            FROM storefront.order_item
            WHERE order_id = ANY($1)
            GROUP BY product_id
        ) s
        WHERE p.id = s.product_id
        ",
    )
    .bind(&doomed)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM storefront.checkout_request WHERE order_ids && $1")
        .bind(&doomed)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query(r#"DELETE FROM storefront."order" WHERE id = ANY($1)"#)
        .bind(&doomed)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted)
}

/// Whether the order is one of the user's placed orders and contains the product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn contains_product(
    pool: &PgPool,
    user_id: &UserId,
    order_id: OrderId,
    product_id: ProductId,
) -> Result<bool, RepositoryError> {
    let found: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM storefront."order" o
            JOIN storefront.order_item oi ON oi.order_id = o.id
            WHERE o.id = $1 AND o.user_id = $2 AND oi.product_id = $3
              AND (o.payment_method = 'COD' OR o.is_paid)
        )
        "#,
    )
    .bind(order_id)
    .bind(user_id)
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(found)
}

/// `(placed order count, revenue)`, optionally for a single store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn totals(pool: &PgPool, store_id: Option<StoreId>) -> Result<(i64, Decimal), RepositoryError> {
    let totals: (i64, Decimal) = sqlx::query_as(&format!(
        r#"
        SELECT COUNT(*), COALESCE(SUM(total), 0)
        FROM storefront."order"
        WHERE ($1::uuid IS NULL OR store_id = $1) AND {VISIBLE}
        "#
    ))
    .bind(store_id)
    .fetch_one(pool)
    .await?;

    Ok(totals)
}
