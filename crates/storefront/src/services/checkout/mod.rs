//! Checkout service.
//!
//! Splits a cart into one order per store, applies coupon and membership
//! pricing, persists everything in a single transaction and then dispatches
//! payment: cash-on-delivery orders are placed immediately, hosted checkout
//! orders wait for the processor's webhook.

mod error;
pub mod plan;

pub use error::CheckoutError;
pub use plan::{CheckoutItem, CheckoutRequest, ValidCheckout};

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use marketplace_core::{OrderId, PaymentMethod, UserId};

use crate::config::StorefrontConfig;
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::error::add_breadcrumb;
use crate::db::{RepositoryError, addresses, cart, checkout_requests, coupons, orders, products};
use crate::identity::Caller;
use crate::models::Coupon;
use crate::payments::webhook::WebhookEvent;
use crate::payments::{CheckoutSession, PaymentClient, SessionRequest};

/// How long a hosted checkout session stays open.
const SESSION_TTL_MINUTES: i64 = 30;

/// Message returned for placed pay-on-delivery orders.
const PLACED_MESSAGE: &str = "Orders Placed Successfully";

/// Session metadata keys echoed back on webhooks.
const META_ORDER_IDS: &str = "orderIds";
const META_USER_ID: &str = "userId";
const META_APP_ID: &str = "appId";

/// Successful checkout response. Also stored verbatim for idempotent replays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    /// Hosted checkout: redirect the customer to `session.url`.
    Session { session: CheckoutSession },
    /// Pay-on-delivery orders were placed.
    Placed { message: String },
}

/// What a payment webhook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventOutcome {
    /// Orders were marked paid.
    Paid(u64),
    /// Unpaid orders were cancelled and restocked.
    Cancelled(u64),
    /// Event type or app we don't handle.
    Ignored,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    payments: &'a PaymentClient,
    config: &'a StorefrontConfig,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        payments: &'a PaymentClient,
        config: &'a StorefrontConfig,
    ) -> Self {
        Self {
            pool,
            payments,
            config,
        }
    }

    /// Place the caller's orders.
    ///
    /// With an idempotency key, a repeat of a completed checkout returns the
    /// original response instead of placing new orders.
    ///
    /// # Errors
    ///
    /// Returns the `CheckoutError` variant describing why nothing was placed.
    #[instrument(skip_all, fields(user_id = %caller.user_id))]
    pub async fn place_order(
        &self,
        caller: &Caller,
        request: CheckoutRequest,
        idempotency_key: Option<&str>,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let checkout = request.validate()?;
        let idempotency_key = idempotency_key
            .map(plan::validate_idempotency_key)
            .transpose()?;

        if let Some(key) = idempotency_key
            && let Some(previous) = checkout_requests::find(self.pool, &caller.user_id, key).await?
        {
            return match previous.response {
                Some(response) => {
                    info!(key, "Replaying stored checkout response");
                    serde_json::from_value(response).map_err(|e| {
                        CheckoutError::Repository(RepositoryError::DataCorruption(format!(
                            "stored checkout response: {e}"
                        )))
                    })
                }
                None => Err(CheckoutError::DuplicateRequest),
            };
        }

        if !addresses::is_owned_by(self.pool, checkout.address_id, &caller.user_id).await? {
            return Err(CheckoutError::InvalidRequest(
                "address not found".to_string(),
            ));
        }

        let is_member = caller.has_plan(&self.config.identity.membership_plan);
        let coupon = match &checkout.coupon_code {
            Some(code) => {
                let prior_orders = orders::count_for_user(self.pool, &caller.user_id).await?;
                let found = coupons::find_active(self.pool, code, Utc::now()).await?;
                Some(plan::resolve_coupon(found, prior_orders, is_member)?)
            }
            None => None,
        };

        let (order_ids, priced) = self
            .persist_orders(&caller.user_id, &checkout, coupon.as_ref(), is_member, idempotency_key)
            .await?;

        add_breadcrumb(
            "checkout",
            &format!("Placed {} order(s)", order_ids.len()),
            Some(&[("payment_method", checkout.payment_method.as_str())]),
        );

        let response = match checkout.payment_method {
            PaymentMethod::Stripe => {
                self.open_session(&caller.user_id, &order_ids, &priced, coupon.as_ref())
                    .await?
            }
            PaymentMethod::Cod => {
                if let Err(e) = cart::clear_cart(self.pool, &caller.user_id).await {
                    warn!(error = %e, "Orders placed but cart could not be cleared");
                }
                CheckoutResponse::Placed {
                    message: PLACED_MESSAGE.to_string(),
                }
            }
        };

        if let Some(key) = idempotency_key {
            let stored = serde_json::to_value(&response).map_err(|e| {
                CheckoutError::Repository(RepositoryError::DataCorruption(e.to_string()))
            })?;
            if let Err(e) =
                checkout_requests::store_response(self.pool, &caller.user_id, key, &stored).await
            {
                warn!(error = %e, key, "Failed to store checkout response");
            }
        }

        info!(
            order_ids = ?order_ids,
            payment_method = %checkout.payment_method,
            "Checkout completed"
        );
        Ok(response)
    }

    /// Insert orders and items, decrement stock and record the idempotency key,
    /// all in one transaction.
    async fn persist_orders(
        &self,
        user_id: &UserId,
        checkout: &ValidCheckout,
        coupon: Option<&Coupon>,
        is_member: bool,
        idempotency_key: Option<&str>,
    ) -> Result<(Vec<OrderId>, Vec<plan::PricedOrder>), CheckoutError> {
        let coupon_snapshot = coupon
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| CheckoutError::Repository(RepositoryError::DataCorruption(e.to_string())))?;

        let mut tx = self.pool.begin().await?;

        // A concurrent first checkout may have committed since the coupon was resolved
        if let Some(coupon) = coupon.filter(|c| c.for_new_user) {
            orders::lock_user_checkouts(&mut *tx, user_id).await?;
            let prior_orders = orders::count_for_user(&mut *tx, user_id).await?;
            plan::check_first_order(coupon, prior_orders)?;
        }

        let ids: Vec<_> = checkout.items.iter().map(|i| i.id).collect();
        let catalog: HashMap<_, _> = products::lock_for_checkout(&mut *tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let groups = plan::group_by_store(&checkout.items, &catalog)?;
        let priced = plan::price_orders(
            groups,
            coupon,
            is_member,
            self.config.checkout.shipping_fee,
        );

        let mut order_ids = Vec::with_capacity(priced.len());
        for order in &priced {
            let order_id = orders::insert_order(
                &mut *tx,
                &NewOrder {
                    user_id,
                    store_id: order.group.store_id,
                    address_id: checkout.address_id,
                    total: order.total,
                    payment_method: checkout.payment_method,
                    coupon: coupon_snapshot.clone(),
                },
            )
            .await?;

            let mut items = Vec::with_capacity(order.group.lines.len());
            for line in &order.group.lines {
                let reserved =
                    products::decrement_stock(&mut *tx, line.product_id, line.quantity).await?;
                items.push(NewOrderItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    reserved_quantity: reserved,
                    price: line.unit_price,
                });
            }
            orders::insert_items(&mut *tx, order_id, &items).await?;
            order_ids.push(order_id);
        }

        if let Some(key) = idempotency_key {
            checkout_requests::insert(&mut *tx, user_id, key, &order_ids)
                .await
                .map_err(|e| match &e {
                    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                        CheckoutError::DuplicateRequest
                    }
                    _ => CheckoutError::from(e),
                })?;
        }

        tx.commit().await?;
        Ok((order_ids, priced))
    }

    /// Open a hosted checkout session, cancelling the orders if that fails.
    async fn open_session(
        &self,
        user_id: &UserId,
        order_ids: &[OrderId],
        priced: &[plan::PricedOrder],
        coupon: Option<&Coupon>,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let request = SessionRequest {
            line_items: plan::session_line_items(priced, coupon)?,
            success_url: format!("{}loading?nextUrl=orders", self.base_url()),
            cancel_url: format!("{}cart", self.base_url()),
            expires_at: Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
            metadata: session_metadata(order_ids, user_id, &self.config.payments.app_id),
        };

        match self.payments.create_checkout_session(&request).await {
            Ok(session) => Ok(CheckoutResponse::Session { session }),
            Err(e) => {
                match orders::cancel_unpaid(self.pool, order_ids).await {
                    Ok(cancelled) => info!(cancelled, "Cancelled orders after payment failure"),
                    Err(cancel_err) => {
                        tracing::error!(error = %cancel_err, order_ids = ?order_ids, "Failed to cancel orders after payment failure");
                    }
                }
                Err(CheckoutError::UpstreamPaymentError(e))
            }
        }
    }

    /// Base URL with exactly one trailing slash.
    fn base_url(&self) -> String {
        let base = self.config.base_url.as_str();
        format!("{}/", base.trim_end_matches('/'))
    }

    /// Apply a verified payment webhook event.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidRequest` if the session metadata is
    /// malformed, or `CheckoutError::Repository` if the update fails.
    #[instrument(skip_all, fields(event_id = %event.id, kind = %event.kind))]
    pub async fn handle_payment_event(
        &self,
        event: &WebhookEvent,
    ) -> Result<PaymentEventOutcome, CheckoutError> {
        let session = &event.data.object;
        let from_this_app = session
            .metadata
            .get(META_APP_ID)
            .is_some_and(|app| *app == self.config.payments.app_id);

        match payment_action(&event.kind, session.payment_status.as_deref(), from_this_app) {
            PaymentAction::MarkPaid => {
                let (order_ids, user_id) = parse_metadata(&session.metadata)?;
                let paid = orders::mark_paid(self.pool, &order_ids, &user_id).await?;
                cart::clear_cart(self.pool, &user_id).await?;
                info!(paid, user_id = %user_id, "Orders paid");
                Ok(PaymentEventOutcome::Paid(paid))
            }
            PaymentAction::Cancel => {
                let (order_ids, _) = parse_metadata(&session.metadata)?;
                let cancelled = orders::cancel_unpaid(self.pool, &order_ids).await?;
                info!(cancelled, "Unpaid session orders cancelled");
                Ok(PaymentEventOutcome::Cancelled(cancelled))
            }
            PaymentAction::Ignore => Ok(PaymentEventOutcome::Ignored),
        }
    }
}

/// What to do with a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentAction {
    MarkPaid,
    Cancel,
    Ignore,
}

/// Map a session event to an action.
///
/// A completed session may still be awaiting a delayed payment method; its
/// orders are paid on `async_payment_succeeded` and cancelled on
/// `async_payment_failed`.
fn payment_action(kind: &str, payment_status: Option<&str>, from_this_app: bool) -> PaymentAction {
    if !from_this_app {
        return PaymentAction::Ignore;
    }
    match kind {
        "checkout.session.completed" if payment_status.is_none_or(|s| s == "paid") => {
            PaymentAction::MarkPaid
        }
        "checkout.session.completed" => {
            info!(status = ?payment_status, "Session completed without payment");
            PaymentAction::Ignore
        }
        "checkout.session.async_payment_succeeded" => PaymentAction::MarkPaid,
        "checkout.session.expired" | "checkout.session.async_payment_failed" => PaymentAction::Cancel,
        _ => PaymentAction::Ignore,
    }
}

/// Metadata attached to a hosted session.
fn session_metadata(order_ids: &[OrderId], user_id: &UserId, app_id: &str) -> Vec<(String, String)> {
    let joined = order_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    vec![
        (META_ORDER_IDS.to_string(), joined),
        (META_USER_ID.to_string(), user_id.to_string()),
        (META_APP_ID.to_string(), app_id.to_string()),
    ]
}

/// Read order IDs and user back out of session metadata.
fn parse_metadata(
    metadata: &HashMap<String, String>,
) -> Result<(Vec<OrderId>, UserId), CheckoutError> {
    let missing = |key: &str| CheckoutError::InvalidRequest(format!("session metadata lacks {key}"));

    let user_id = metadata
        .get(META_USER_ID)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| missing(META_USER_ID))?;
    let order_ids = metadata
        .get(META_ORDER_IDS)
        .ok_or_else(|| missing(META_ORDER_IDS))?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<OrderId>, _>>()
        .map_err(|e| CheckoutError::InvalidRequest(format!("invalid order id in metadata: {e}")))?;

    Ok((order_ids, UserId::new(user_id.as_str())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_round_trip() {
        let ids = vec![OrderId::generate(), OrderId::generate()];
        let user = UserId::new("user_2abc");
        let metadata: HashMap<_, _> = session_metadata(&ids, &user, "marketplace")
            .into_iter()
            .collect();
        assert_eq!(metadata.get("appId").map(String::as_str), Some("marketplace"));

        let (parsed_ids, parsed_user) = parse_metadata(&metadata).unwrap();
        assert_eq!(parsed_ids, ids);
        assert_eq!(parsed_user, user);
    }

    #[test]
    fn test_parse_metadata_rejects_garbage() {
        let mut metadata = HashMap::new();
        metadata.insert("userId".to_string(), "user_1".to_string());
        metadata.insert("orderIds".to_string(), "not-a-uuid".to_string());
        assert!(matches!(
            parse_metadata(&metadata),
            Err(CheckoutError::InvalidRequest(_))
        ));

        metadata.remove("userId");
        assert!(matches!(
            parse_metadata(&metadata),
            Err(CheckoutError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_payment_actions() {
        let completed = "checkout.session.completed";
        assert_eq!(payment_action(completed, Some("paid"), true), PaymentAction::MarkPaid);
        assert_eq!(payment_action(completed, None, true), PaymentAction::MarkPaid);
        assert_eq!(payment_action(completed, Some("unpaid"), true), PaymentAction::Ignore);
        assert_eq!(payment_action(completed, Some("paid"), false), PaymentAction::Ignore);

        assert_eq!(
            payment_action("checkout.session.async_payment_succeeded", Some("paid"), true),
            PaymentAction::MarkPaid
        );
        assert_eq!(
            payment_action("checkout.session.async_payment_failed", Some("unpaid"), true),
            PaymentAction::Cancel
        );
        assert_eq!(
            payment_action("checkout.session.expired", Some("unpaid"), true),
            PaymentAction::Cancel
        );
        assert_eq!(
            payment_action("charge.refunded", None, true),
            PaymentAction::Ignore
        );
    }

    #[test]
    fn test_response_shapes() {
        let placed = CheckoutResponse::Placed {
            message: PLACED_MESSAGE.to_string(),
        };
        assert_eq!(
            serde_json::to_value(&placed).unwrap(),
            serde_json::json!({"message": "Orders Placed Successfully"})
        );

        let session = CheckoutResponse::Session {
            session: CheckoutSession {
                id: "cs_test_1".to_string(),
                url: "https://checkout.example.com/c/cs_test_1".to_string(),
                expires_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            },
        };
        let stored = serde_json::to_value(&session).unwrap();
        assert_eq!(stored["session"]["url"], "https://checkout.example.com/c/cs_test_1");
        let replayed: CheckoutResponse = serde_json::from_value(stored).unwrap();
        assert_eq!(replayed, session);
    }
}
