//! Operator command-line interface.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tabled::{Table, Tabled};

use crate::config::Config;
use crate::db;
use crate::domain::VariantId;
use crate::error::{CartError, Result};
use crate::store::{CatalogStore, OrderStore, ReservationStore, SqliteStore};

/// Stockroom - stock reservation and cart engine.
#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "stockroom.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show effective availability for a variant
    Availability {
        /// Variant to inspect
        variant_id: String,
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List active stock reservations
    Reservations,

    /// Delete reservations whose hold has lapsed
    Sweep,

    /// List committed orders, newest first
    Orders,
}

#[derive(Tabled)]
struct ReservationLine {
    #[tabled(rename = "Variant")]
    variant: String,
    #[tabled(rename = "Holder")]
    holder: String,
    #[tabled(rename = "Qty")]
    quantity: u32,
    #[tabled(rename = "Expires")]
    expires: String,
}

#[derive(Tabled)]
struct OrderSummary {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Items")]
    items: u32,
    #[tabled(rename = "Total")]
    total: String,
}

/// Execute one CLI invocation.
///
/// # Errors
/// Returns an error when configuration, storage or the requested lookup
/// fails; the binary maps that to a nonzero exit.
pub async fn run(cli: Cli) -> Result<()> {
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    config.init_logging();

    let pool = db::create_pool(&config.database.url, config.database.max_connections)?;
    db::run_migrations(&pool)?;
    let store = Arc::new(SqliteStore::new(pool));

    match cli.command {
        Commands::Availability { variant_id, json } => {
            let variant_id = VariantId::new(variant_id);
            let variant = store
                .variant(&variant_id)
                .await?
                .ok_or(CartError::VariantNotFound {
                    variant: variant_id.clone(),
                })?;
            let reserved = store.reserved_total(&variant_id).await?;
            let available = variant.stock.saturating_sub(reserved);
            if json {
                println!(
                    "{}",
                    json!({
                        "variant": variant_id.as_str(),
                        "stock": variant.stock,
                        "reserved": reserved,
                        "available": available,
                    })
                );
            } else {
                println!(
                    "{} ({} / {}): stock {}, reserved {}, available {}",
                    variant_id, variant.name, variant.color, variant.stock, reserved, available
                );
            }
        }

        Commands::Reservations => {
            let reservations = store.active().await?;
            if reservations.is_empty() {
                println!("No active reservations.");
            } else {
                let rows: Vec<ReservationLine> = reservations
                    .iter()
                    .map(|r| ReservationLine {
                        variant: r.variant_id.to_string(),
                        holder: r.holder.to_string(),
                        quantity: r.quantity,
                        expires: r.expires_at.to_rfc3339(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Sweep => {
            let released = store.prune_expired().await?;
            println!("Released {released} expired reservation(s).");
        }

        Commands::Orders => {
            let orders = store.orders().await?;
            if orders.is_empty() {
                println!("No orders.");
            } else {
                let rows: Vec<OrderSummary> = orders
                    .iter()
                    .map(|o| OrderSummary {
                        code: o.code.clone(),
                        created: o.created_at.to_rfc3339(),
                        items: o.item_count(),
                        total: o.total.to_string(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}
