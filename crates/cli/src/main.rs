//! Freshmart CLI - Cart, wishlist and delivery desk from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! fm-cli products --category fruits
//! fm-cli categories
//!
//! # Cart
//! fm-cli cart add p123 --unit 1kg --quantity 2
//! fm-cli cart dec p123 --unit 1kg
//! fm-cli cart show
//!
//! # Wishlist
//! fm-cli wishlist add p123
//!
//! # Delivery centre staff
//! fm-cli desk actual o456 p123 1kg 1
//! fm-cli desk action o456 deliver
//! ```
//!
//! Configuration comes from the environment (see `freshmart_client::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use freshmart_client::{ClientConfig, Session, telemetry};
use freshmart_core::OrderAction;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::orders::CheckoutArgs;

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(author, version, about = "Freshmart storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// List products with the unit a product card would preselect
    Products {
        /// Restrict to one category id
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List categories
    Categories,
    /// List delivery centres
    Centres,
    /// Place an order for the current cart
    Checkout {
        #[arg(long)]
        name: String,
        #[arg(long)]
        line1: String,
        #[arg(long)]
        line2: Option<String>,
        #[arg(long)]
        city: String,
        #[arg(long)]
        pincode: String,
        #[arg(long)]
        phone: String,
        /// Delivery day
        #[arg(long)]
        day: String,
        /// Delivery time slot
        #[arg(long)]
        time: String,
        /// Delivery centre id
        #[arg(long)]
        centre: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Delivery centre workflow
    Desk {
        #[command(subcommand)]
        action: DeskAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product_id: String,
        /// Unit label (defaults to the unit already in the cart, else the first offered)
        #[arg(short, long)]
        unit: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Update {
        product_id: String,
        quantity: u32,
        /// Unit of the line to change
        #[arg(short, long)]
        unit: Option<String>,
        /// Move the line to this unit
        #[arg(long)]
        new_unit: Option<String>,
    },
    /// Increase a line by one
    Inc {
        product_id: String,
        #[arg(short, long)]
        unit: String,
    },
    /// Decrease a line by one
    Dec {
        product_id: String,
        #[arg(short, long)]
        unit: String,
    },
    /// Remove a line
    Remove {
        product_id: String,
        #[arg(short, long)]
        unit: Option<String>,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List saved products
    Show,
    /// Save a product
    Add { product_id: String },
    /// Remove a saved product
    Remove { product_id: String },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders
    List,
    /// Show one order
    Show { order_id: String },
}

#[derive(Subcommand)]
enum DeskAction {
    /// Record the delivered quantity of a line and save it
    Actual {
        order_id: String,
        product_id: String,
        unit: String,
        quantity: u32,
    },
    /// Confirm, deliver or cancel an order
    Action {
        order_id: String,
        /// `confirm`, `deliver` or `cancel`
        action: OrderAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(false);
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);

    tracing_subscriber::registry()
        .with(telemetry::env_filter())
        .with(telemetry::fmt_layer(config.log_json))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        // Flush Sentry before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&session).await?,
            CartAction::Add {
                product_id,
                unit,
                quantity,
            } => commands::cart::add(&session, &product_id, unit.as_deref(), quantity).await?,
            CartAction::Update {
                product_id,
                quantity,
                unit,
                new_unit,
            } => {
                commands::cart::update(
                    &session,
                    &product_id,
                    quantity,
                    unit.as_deref(),
                    new_unit.as_deref(),
                )
                .await?;
            }
            CartAction::Inc { product_id, unit } => {
                commands::cart::increment(&session, &product_id, &unit).await?;
            }
            CartAction::Dec { product_id, unit } => {
                commands::cart::decrement(&session, &product_id, &unit).await?;
            }
            CartAction::Remove { product_id, unit } => {
                commands::cart::remove(&session, &product_id, unit.as_deref()).await?;
            }
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&session).await?,
            WishlistAction::Add { product_id } => {
                commands::wishlist::add(&session, &product_id).await?;
            }
            WishlistAction::Remove { product_id } => {
                commands::wishlist::remove(&session, &product_id).await?;
            }
        },
        Commands::Products { category } => {
            commands::catalog::products(&session, category.as_deref()).await?;
        }
        Commands::Categories => commands::catalog::categories(&session).await?,
        Commands::Centres => commands::catalog::centres(&session).await?,
        Commands::Checkout {
            name,
            line1,
            line2,
            city,
            pincode,
            phone,
            day,
            time,
            centre,
            notes,
        } => {
            let args = CheckoutArgs {
                name,
                line1,
                line2,
                city,
                pincode,
                phone,
                day,
                time,
                centre,
                notes,
            };
            commands::orders::checkout(&session, args).await?;
        }
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(&session).await?,
            OrdersAction::Show { order_id } => commands::orders::show(&session, &order_id).await?,
        },
        Commands::Desk { action } => match action {
            DeskAction::Actual {
                order_id,
                product_id,
                unit,
                quantity,
            } => {
                commands::orders::record_actual(&session, &order_id, &product_id, &unit, quantity)
                    .await?;
            }
            DeskAction::Action { order_id, action } => {
                commands::orders::action(&session, &order_id, action).await?;
            }
        },
    }
    Ok(())
}
