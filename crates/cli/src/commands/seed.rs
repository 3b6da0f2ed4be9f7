//! Seed the storefront database with a catalog from YAML.
//!
//! Stores are keyed by owner, products by `(store, name)` and coupons by
//! code, so running the same file twice updates rather than duplicates.
//!
//! ```yaml
//! stores:
//!   - owner: { id: user_seller_1, email: seller@example.com, name: Ada }
//!     status: approved
//!     name: Green Grocer
//!     username: green-grocer
//!     email: hello@greengrocer.example
//!     products:
//!       - name: Heirloom Tomatoes
//!         mrp: "6.00"
//!         price: "4.50"
//!         category: Vegetables
//!         stockQuantity: 40
//! coupons:
//!   - code: WELCOME10
//!     discount: "10"
//!     forNewUser: true
//!     expiresAt: 2027-01-01T00:00:00Z
//! ```

use std::path::Path;

use marketplace_core::{Email, StoreStatus, UserId};
use marketplace_storefront::db::{coupons, products, stores, users::UserRepository};
use marketplace_storefront::models::{NewCoupon, NewProduct, NewStore};
use serde::Deserialize;
use tracing::{error, info};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub stores: Vec<SeedStore>,
    #[serde(default)]
    pub coupons: Vec<NewCoupon>,
}

/// A store together with its owner and products.
#[derive(Debug, Deserialize)]
pub struct SeedStore {
    pub owner: SeedOwner,
    #[serde(default = "approved")]
    pub status: StoreStatus,
    #[serde(flatten)]
    pub store: NewStore,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

/// The identity-provider user that owns a seeded store.
#[derive(Debug, Deserialize)]
pub struct SeedOwner {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

const fn approved() -> StoreStatus {
    StoreStatus::Approved
}

/// A store whose fields have been validated and normalised.
struct PreparedStore {
    owner_id: UserId,
    owner_email: Email,
    owner_name: String,
    store_email: Email,
    status: StoreStatus,
    store: NewStore,
    products: Vec<NewProduct>,
}

/// Validate every entry, normalising codes and usernames in place.
///
/// Returns the prepared stores, or every problem found.
fn prepare(catalog: CatalogFile) -> Result<(Vec<PreparedStore>, Vec<NewCoupon>), Vec<String>> {
    let mut errors = Vec::new();
    let mut prepared = Vec::with_capacity(catalog.stores.len());

    for mut seed in catalog.stores {
        let label = format!("store '{}'", seed.store.username);

        let owner_email = Email::parse(&seed.owner.email)
            .map_err(|e| errors.push(format!("{label}: owner email: {e}")))
            .ok();
        if seed.owner.id.trim().is_empty() {
            errors.push(format!("{label}: owner id is required"));
        }
        let store_email = seed
            .store
            .validate()
            .map_err(|e| errors.push(format!("{label}: {e}")))
            .ok();
        for product in &seed.products {
            if let Err(e) = product.validate() {
                errors.push(format!("{label}: product '{}': {e}", product.name));
            }
        }

        if let (Some(owner_email), Some(store_email)) = (owner_email, store_email) {
            prepared.push(PreparedStore {
                owner_id: UserId::new(seed.owner.id.trim()),
                owner_email,
                owner_name: seed.owner.name,
                store_email,
                status: seed.status,
                store: seed.store,
                products: seed.products,
            });
        }
    }

    let mut coupon_list = catalog.coupons;
    for coupon in &mut coupon_list {
        if let Err(e) = coupon.validate() {
            errors.push(format!("coupon '{}': {e}", coupon.code));
        }
    }

    if errors.is_empty() {
        Ok((prepared, coupon_list))
    } else {
        Err(errors)
    }
}

/// Seed stores, products and coupons from a YAML file.
///
/// The whole file is validated before the database is touched.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let (stores_to_seed, coupons_to_seed) = match prepare(catalog) {
        Ok(prepared) => prepared,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(
        stores = stores_to_seed.len(),
        coupons = coupons_to_seed.len(),
        "Catalog validated"
    );

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);
    let mut product_count = 0usize;

    for seed in &stores_to_seed {
        users
            .upsert(&seed.owner_id, &seed.owner_email, &seed.owner_name, "")
            .await?;
        let store =
            stores::upsert_seeded(&pool, &seed.owner_id, &seed.store, &seed.store_email, seed.status)
                .await?;

        for product in &seed.products {
            products::upsert_seeded(&pool, store.id, product).await?;
        }
        product_count += seed.products.len();

        info!(store = %store.username, products = seed.products.len(), "Store seeded");
    }

    for coupon in &coupons_to_seed {
        coupons::upsert(&pool, coupon).await?;
    }

    info!("Seeding complete!");
    info!("  Stores: {}", stores_to_seed.len());
    info!("  Products: {product_count}");
    info!("  Coupons: {}", coupons_to_seed.len());

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
stores:
  - owner: { id: user_seller_1, email: seller@example.com, name: Ada }
    name: Green Grocer
    username: Green-Grocer
    email: hello@greengrocer.example
    products:
      - name: Heirloom Tomatoes
        mrp: "6.00"
        price: "4.50"
        category: Vegetables
        stockQuantity: 40
  - owner: { id: user_seller_2, email: maker@example.com }
    status: pending
    name: Clay Works
    username: clayworks
    email: studio@clay.example
coupons:
  - code: welcome10
    discount: "10"
    forNewUser: true
    expiresAt: 2027-01-01T00:00:00Z
"#;

    #[test]
    fn test_parse_and_prepare_catalog() {
        let catalog: CatalogFile = serde_yaml::from_str(CATALOG).unwrap();
        let (stores, coupons) = prepare(catalog).unwrap();

        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].status, StoreStatus::Approved);
        assert_eq!(stores[0].store.username, "green-grocer");
        assert_eq!(stores[0].products[0].stock_quantity, 40);
        assert_eq!(stores[1].status, StoreStatus::Pending);
        assert!(stores[1].products.is_empty());

        assert_eq!(coupons[0].code, "WELCOME10");
        assert!(coupons[0].for_new_user);
    }

    #[test]
    fn test_prepare_collects_every_error() {
        let yaml = r#"
stores:
  - owner: { id: " ", email: not-an-email }
    name: Bad Store
    username: "bad store"
    email: also-bad
    products:
      - name: Overpriced
        mrp: "1.00"
        price: "2.00"
        category: Misc
coupons:
  - code: HALF
    discount: "150"
    expiresAt: 2027-01-01T00:00:00Z
"#;
        let catalog: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let errors = prepare(catalog).err().unwrap();

        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("owner email")));
        assert!(errors.iter().any(|e| e.contains("owner id")));
        assert!(errors.iter().any(|e| e.contains("product 'Overpriced'")));
        assert!(errors.iter().any(|e| e.starts_with("coupon 'HALF'")));
    }
}
