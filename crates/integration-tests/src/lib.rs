//! Integration tests for the marketplace storefront.
//!
//! The tests talk to a running server over HTTP and seed or inspect the same
//! database directly. They are `#[ignore]`d so `cargo test` stays offline.
//!
//! # Running Tests
//!
//! ```bash
//! mp-cli migrate
//! cargo run -p marketplace-storefront &
//! cargo test -p marketplace-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_URL` - Server under test (default `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - Database the server uses
//! - `TEST_CUSTOMER_TOKEN` - Identity-provider session token for a customer
//! - `PAYMENTS_WEBHOOK_SECRET` - Secret the server verifies webhooks with

use hmac::{Hmac, Mac};
use marketplace_core::{AddressId, Email, ProductId, StoreId, StoreStatus, UserId};
use marketplace_storefront::db::{addresses, products, stores, users::UserRepository};
use marketplace_storefront::models::{NewAddress, NewProduct, NewStore};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;

/// An order as persisted, with the products of its lines.
#[derive(Debug, Clone)]
pub struct PersistedOrder {
    pub id: Uuid,
    pub total: Decimal,
    pub product_ids: Vec<Uuid>,
}

/// Shared handles for one test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
    customer_token: SecretString,
}

impl TestContext {
    /// Connect to the server and database named in the environment.
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or the database is unreachable.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let database_url = std::env::var("STOREFRONT_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map(SecretString::from)
            .expect("STOREFRONT_DATABASE_URL must be set");
        let customer_token = std::env::var("TEST_CUSTOMER_TOKEN")
            .map(SecretString::from)
            .expect("TEST_CUSTOMER_TOKEN must be set");

        let pool = marketplace_storefront::db::create_pool(&database_url)
            .await
            .expect("Failed to connect to storefront database");

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            pool,
            customer_token,
        }
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Request authenticated as the test customer.
    #[must_use]
    pub fn as_customer(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.customer_token.expose_secret())
    }

    /// Create a seller with an approved store holding one product.
    ///
    /// # Panics
    ///
    /// Panics if any insert fails.
    pub async fn seed_product(&self, price: Decimal, mrp: Decimal, stock: i32) -> ProductId {
        let suffix = Uuid::new_v4().simple().to_string();
        let owner = UserId::new(format!("user_it_{suffix}"));
        let email = Email::parse(&format!("seller-{suffix}@example.com")).expect("valid email");

        UserRepository::new(&self.pool)
            .upsert(&owner, &email, "Integration Seller", "")
            .await
            .expect("Failed to create seller");

        let application = NewStore {
            name: format!("IT Store {suffix}"),
            username: format!("it-{suffix}"),
            description: String::new(),
            email: email.to_string(),
            contact: String::new(),
            address: String::new(),
            logo: String::new(),
        };
        let store = stores::upsert_seeded(&self.pool, &owner, &application, &email, StoreStatus::Approved)
            .await
            .expect("Failed to create store");

        let product = NewProduct {
            name: format!("IT Product {suffix}"),
            description: String::new(),
            mrp,
            price,
            images: Vec::new(),
            category: "Testing".to_string(),
            stock_quantity: stock,
        };
        products::create(&self.pool, store.id, &product)
            .await
            .expect("Failed to create product")
            .id
    }

    /// Current stock for a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn stock_of(&self, product_id: ProductId) -> i32 {
        sqlx::query_scalar("SELECT stock_quantity FROM storefront.product WHERE id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read stock")
    }

    /// Create a customer with one address directly in the database.
    ///
    /// # Panics
    ///
    /// Panics if any insert fails.
    pub async fn seed_buyer(&self) -> (UserId, AddressId) {
        let suffix = Uuid::new_v4().simple().to_string();
        let user_id = UserId::new(format!("user_buyer_{suffix}"));
        let email = Email::parse(&format!("buyer-{suffix}@example.com")).expect("valid email");

        UserRepository::new(&self.pool)
            .upsert(&user_id, &email, "Integration Buyer", "")
            .await
            .expect("Failed to create buyer");

        let address = NewAddress {
            name: "Integration Buyer".to_string(),
            email: email.to_string(),
            street: "1 Test Street".to_string(),
            city: "Springfield".to_string(),
            state: "OR".to_string(),
            zip: "97477".to_string(),
            country: "US".to_string(),
            phone: "+1 555 0100".to_string(),
        };
        let address = addresses::create(&self.pool, &user_id, &address, &email)
            .await
            .expect("Failed to create address");

        (user_id, address.id)
    }

    /// Store that owns a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn store_of(&self, product_id: ProductId) -> StoreId {
        sqlx::query_scalar("SELECT store_id FROM storefront.product WHERE id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read store")
    }

    /// Every order with a line for the product, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn orders_with_product(&self, product_id: ProductId) -> Vec<PersistedOrder> {
        let rows: Vec<(Uuid, Decimal, Vec<Uuid>)> = sqlx::query_as(
            r#"
            SELECT o.id, o.total, ARRAY_AGG(oi.product_id ORDER BY oi.product_id)
            FROM storefront."order" o
            JOIN storefront.order_item oi ON oi.order_id = o.id
            WHERE o.id IN (SELECT order_id FROM storefront.order_item WHERE product_id = $1)
            GROUP BY o.id, o.total, o.created_at
            ORDER BY o.created_at
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .expect("Failed to read orders");

        rows.into_iter()
            .map(|(id, total, product_ids)| PersistedOrder {
                id,
                total,
                product_ids,
            })
            .collect()
    }
}

/// Build a `Stripe-Signature` header value for a webhook payload.
///
/// # Panics
///
/// Never; HMAC accepts keys of any length.
#[must_use]
pub fn sign_webhook(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC key");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
