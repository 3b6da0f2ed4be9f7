//! Subcommand implementations.

pub mod coupon;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Environment variable holding the storefront connection string.
pub const DATABASE_URL_VAR: &str = "STOREFRONT_DATABASE_URL";

/// Connect to the storefront database using `.env` and the process environment.
///
/// # Errors
///
/// Returns an error if neither `STOREFRONT_DATABASE_URL` nor `DATABASE_URL`
/// is set, or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| format!("{DATABASE_URL_VAR} not set"))?;

    tracing::info!("Connecting to storefront database...");
    let pool = marketplace_storefront::db::create_pool(&database_url).await?;
    Ok(pool)
}
