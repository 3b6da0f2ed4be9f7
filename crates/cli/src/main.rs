//! Marketplace CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! mp-cli migrate
//!
//! # Create a coupon
//! mp-cli coupon create -c WELCOME10 -d 10 --new-user --public --expires-in-days 30
//!
//! # Seed stores, products and coupons from YAML
//! mp-cli seed catalog data/catalog.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "Marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage coupons
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum CouponAction {
    /// Create a new coupon
    Create {
        /// Coupon code (stored upper case)
        #[arg(short, long)]
        code: String,

        /// Discount percentage, greater than 0 and at most 100
        #[arg(short, long)]
        discount: Decimal,

        /// Description shown to customers
        #[arg(long, default_value = "")]
        description: String,

        /// Only valid on a customer's first order
        #[arg(long)]
        new_user: bool,

        /// Only valid for members
        #[arg(long)]
        member: bool,

        /// Listed publicly
        #[arg(long)]
        public: bool,

        /// Days until the coupon expires
        #[arg(long, default_value_t = 30)]
        expires_in_days: i64,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert stores, products and coupons from a YAML file
    Catalog {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Coupon { action } => match action {
            CouponAction::Create {
                code,
                discount,
                description,
                new_user,
                member,
                public,
                expires_in_days,
            } => {
                let options = commands::coupon::CouponOptions {
                    code,
                    discount,
                    description,
                    for_new_user: new_user,
                    for_member: member,
                    is_public: public,
                    expires_in_days,
                };
                commands::coupon::create(options).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
    }
    Ok(())
}
