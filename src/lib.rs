//! Stockroom - time-bounded stock reservation and cart engine.
//!
//! This crate is the inventory-safety core of a small storefront: it prevents
//! overselling of limited-stock product variants across anonymous (session)
//! and authenticated (account) shopping contexts, under concurrent requests,
//! with 24-hour holds and a session-to-account merge at login.
//!
//! # Architecture
//!
//! - **`domain`** - Identifiers, the holder abstraction, variants,
//!   reservations, the dual-representation cart and orders.
//! - **`store`** - Narrow persistence traits with a production SQLite/Diesel
//!   backend and an in-memory backend for tests.
//! - **`service`** - The operations with real invariants:
//!   - [`service::CartService`] - availability-checked add/update/remove and
//!     the lazy-sweeping cart snapshot
//!   - [`service::CartMerger`] - the login merge protocol (additive union,
//!     clamped, never blocks login)
//!   - [`service::CheckoutService`] - atomic commit with stock revalidation
//!
//! Every mutation of a variant's availability is serialized through
//! [`service::VariantLocks`]; without that, two concurrent requests can both
//! observe stale availability and oversubscribe stock.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`db`] - Diesel connection pool, schema and row models
//! - [`domain`] - Storefront domain types
//! - [`error`] - Error types for the crate
//! - [`service`] - Cart, merge and checkout services
//! - [`store`] - Pluggable storage backends
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stockroom::config::Config;
//! use stockroom::db;
//! use stockroom::service::{CartService, VariantLocks};
//! use stockroom::store::SqliteStore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("stockroom.toml")?;
//!     let pool = db::create_pool(&config.database.url, config.database.max_connections)?;
//!     db::run_migrations(&pool)?;
//!
//!     let store = Arc::new(SqliteStore::new(pool));
//!     let locks = Arc::new(VariantLocks::new());
//!     let _cart = CartService::new(store, locks, config.hold.duration());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
