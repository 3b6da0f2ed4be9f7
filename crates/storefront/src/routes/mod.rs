//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Liveness
//! GET  /health/ready                     - Readiness (database ping)
//!
//! # Catalog (public)
//! GET  /api/products                     - Product listing (?category=&q=&limit=)
//! GET  /api/products/{id}                - Product detail with store and ratings
//!
//! # Customer (requires auth)
//! POST /api/orders                       - Checkout (optional Idempotency-Key)
//! GET  /api/orders                       - Order history
//! GET  /api/cart                         - Cart
//! PUT  /api/cart                         - Replace cart
//! GET  /api/favorites                    - Favorite product IDs
//! POST /api/favorites/{product_id}       - Toggle favorite
//! GET  /api/addresses                    - Addresses
//! POST /api/addresses                    - Add address
//! POST /api/coupons/verify               - Check a coupon code
//! GET  /api/ratings                      - Caller's ratings
//! POST /api/ratings                      - Rate an ordered product
//!
//! # Seller
//! POST /api/store                        - Apply for a store (auth)
//! GET  /api/store/status                 - Application status (auth)
//! GET  /api/store/dashboard              - Totals and ratings
//! GET  /api/store/products               - Store products
//! POST /api/store/products               - Add product
//! POST /api/store/products/{id}/stock    - Set stock
//! GET  /api/store/orders                 - Store orders
//! POST /api/store/orders/{id}/status     - Update fulfillment status
//!
//! # Admin
//! GET  /api/admin/dashboard              - Marketplace totals
//! GET  /api/admin/stores                 - Stores (?status=)
//! POST /api/admin/stores/{id}/approve    - Approve or reject
//! POST /api/admin/stores/{id}/toggle-active
//! GET  /api/admin/coupons                - Coupons
//! POST /api/admin/coupons                - Create coupon
//! DELETE /api/admin/coupons/{code}       - Delete coupon
//!
//! # Payment processor
//! POST /api/payments/webhook             - Signed session events
//! ```

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod coupons;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod ratings;
pub mod store;
pub mod webhooks;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            post(orders::create)
                .layer(checkout_rate_limiter())
                .get(orders::list),
        )
        .route("/cart", get(cart::show).put(cart::replace))
        .route("/favorites", get(favorites::index))
        .route("/favorites/{product_id}", post(favorites::toggle))
        .route("/addresses", get(addresses::index).post(addresses::create))
        .route("/coupons/verify", post(coupons::verify))
        .route("/ratings", get(ratings::index).post(ratings::create))
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the seller routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(store::apply))
        .route("/status", get(store::status))
        .route("/dashboard", get(store::dashboard))
        .route(
            "/products",
            get(store::list_products).post(store::create_product),
        )
        .route("/products/{id}/stock", post(store::set_stock))
        .route("/orders", get(store::list_orders))
        .route("/orders/{id}/status", post(store::update_order_status))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/stores", get(admin::list_stores))
        .route("/stores/{id}/approve", post(admin::review_store))
        .route("/stores/{id}/toggle-active", post(admin::toggle_store))
        .route(
            "/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route("/coupons/{code}", delete(admin::delete_coupon))
}

/// Create all routes for the storefront API.
///
/// Everything under `/api` is rate limited per client IP except the payment
/// webhook, which only the processor calls.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(customer_routes())
        .nest("/products", product_routes())
        .nest("/store", store_routes())
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter());

    Router::new()
        .nest("/api", api)
        .route("/api/payments/webhook", post(webhooks::payment))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::{StorefrontConfig, test_config};
    use crate::payments::webhook::sign;
    use crate::state::AppState;

    const CLIENT_IP: &str = "203.0.113.10";

    fn app_with(config: StorefrontConfig) -> axum::Router {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://marketplace@127.0.0.1:1/unreachable")
            .unwrap();
        crate::app(AppState::new(config, pool).unwrap())
    }

    fn app() -> axum::Router {
        app_with(test_config())
    }

    fn request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT_IP)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Identity provider stand-in that rejects every token.
    async fn rejecting_identity_provider() -> Url {
        let provider = axum::Router::new().route(
            "/v1/tokens/verify",
            axum::routing::post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, provider).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn test_orders_require_authentication() {
        for method in ["GET", "POST"] {
            let response = app()
                .oneshot(
                    request(method, "/api/orders")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method}");
            let body = json_body(response).await;
            assert_eq!(body["code"], "unauthenticated");
        }
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthenticated() {
        let mut config = test_config();
        config.identity.api_url = rejecting_identity_provider().await;

        let response = app_with(config)
            .oneshot(
                request("GET", "/api/cart")
                    .header(header::AUTHORIZATION, "Bearer sess_revoked")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_seller_and_admin_routes_require_authentication() {
        for uri in ["/api/store/dashboard", "/api/admin/dashboard", "/api/store/status"] {
            let response = app()
                .oneshot(request("GET", uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_rejected() {
        let response = app()
            .oneshot(
                request("POST", "/api/payments/webhook")
                    .body(Body::from(r#"{"id":"evt_1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "invalid_webhook");
    }

    #[tokio::test]
    async fn test_webhook_with_wrong_secret_is_rejected() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;
        let signature = sign(payload, "whsec_someone_else", Utc::now().timestamp());

        let response = app()
            .oneshot(
                request("POST", "/api/payments/webhook")
                    .header("stripe-signature", signature)
                    .body(Body::from(payload.as_slice()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_ignores_unrelated_events() {
        let secret = "whsec_test_R4nd0mW3bh00k";
        let events = [
            r#"{"id":"evt_2","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#,
            r#"{"id":"evt_3","type":"checkout.session.completed","data":{"object":{"id":"cs_1","metadata":{"appId":"another-app","orderIds":"x","userId":"u"}}}}"#,
        ];
        for payload in events {
            let signature = sign(payload.as_bytes(), secret, Utc::now().timestamp());
            let response = app()
                .oneshot(
                    request("POST", "/api/payments/webhook")
                        .header("stripe-signature", signature)
                        .body(Body::from(payload))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["received"], true);
        }
    }

    #[tokio::test]
    async fn test_invalid_product_id_is_rejected() {
        let response = app()
            .oneshot(request("GET", "/api/products/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
