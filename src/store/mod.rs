//! Persistence layer with pluggable storage backends.
//!
//! Four narrow traits cover the four aggregates this crate touches. The
//! production backend is [`SqliteStore`]; [`MemoryStore`] backs tests. The
//! availability check-and-write race is closed one level up, in the service
//! layer's per-variant locks; these traits only promise that
//! [`OrderStore::commit`] is atomic within a single backend transaction.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::future::Future;

use chrono::Duration;

use crate::domain::{AccountId, CartLine, Holder, Order, OrderId, Reservation, Variant, VariantId};
use crate::error::Result;

/// Read access to the catalog's variants.
///
/// The catalog service owns this data; the only write this crate ever makes
/// is the stock decrement inside [`OrderStore::commit`].
pub trait CatalogStore: Send + Sync {
    /// Fetch a variant by id.
    fn variant(&self, id: &VariantId) -> impl Future<Output = Result<Option<Variant>>> + Send;
}

/// Storage operations for stock reservations.
pub trait ReservationStore: Send + Sync {
    /// Get the reservation for a (variant, holder) pair.
    fn reservation(
        &self,
        variant_id: &VariantId,
        holder: &Holder,
    ) -> impl Future<Output = Result<Option<Reservation>>> + Send;

    /// Sum of active reservation quantities for the variant held by anyone
    /// *other than* `holder`.
    ///
    /// This is the subtrahend of the effective-availability computation;
    /// "active" always means `expires_at > now`, whether or not a sweep ran.
    fn reserved_by_others(
        &self,
        variant_id: &VariantId,
        holder: &Holder,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Sum of all active reservation quantities for the variant.
    fn reserved_total(&self, variant_id: &VariantId)
        -> impl Future<Output = Result<u32>> + Send;

    /// Save a reservation, replacing any existing row for its
    /// (variant, holder) key.
    fn save(&self, reservation: &Reservation) -> impl Future<Output = Result<()>> + Send;

    /// Delete the holder's reservation. Idempotent; returns whether a row
    /// existed.
    fn release(
        &self,
        variant_id: &VariantId,
        holder: &Holder,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Transfer a hold from `old_holder` to `new_holder` at the merged
    /// quantity, restarting the hold window. Used by the login merge.
    fn re_key(
        &self,
        variant_id: &VariantId,
        old_holder: &Holder,
        new_holder: &Holder,
        merge_quantity: u32,
        hold: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete all reservations with `expires_at <= now`. Returns count
    /// deleted.
    fn prune_expired(&self) -> impl Future<Output = Result<usize>> + Send;

    /// List all active reservations (operator surface).
    fn active(&self) -> impl Future<Output = Result<Vec<Reservation>>> + Send;
}

/// Storage operations for the durable account cart.
pub trait CartStore: Send + Sync {
    /// Get one cart line.
    fn line(
        &self,
        account: &AccountId,
        variant_id: &VariantId,
    ) -> impl Future<Output = Result<Option<CartLine>>> + Send;

    /// List an account's cart lines.
    fn lines(&self, account: &AccountId) -> impl Future<Output = Result<Vec<CartLine>>> + Send;

    /// Save a cart line, replacing any existing row for its
    /// (account, variant) key.
    fn save_line(
        &self,
        account: &AccountId,
        line: &CartLine,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete one cart line. Idempotent; returns whether a row existed.
    fn delete_line(
        &self,
        account: &AccountId,
        variant_id: &VariantId,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Everything [`OrderStore::commit`] must apply as one atomic unit.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The fully assembled order, lines already copied from the cart.
    pub order: Order,
    /// Stock decrements per variant, matching the order lines.
    pub decrements: Vec<(VariantId, u32)>,
    /// Holder identities whose reservations (and durable cart lines, for
    /// account holders) are released by the commit. These identities are
    /// also excluded from the revalidation availability check.
    pub holders: Vec<Holder>,
}

/// Storage operations for committed orders.
pub trait OrderStore: Send + Sync {
    /// Commit a checkout atomically: revalidate effective availability,
    /// decrement stock, persist the order with its line snapshots, release
    /// the holders' reservations and clear their durable cart lines.
    ///
    /// # Errors
    /// Fails with [`crate::error::CheckoutError::StockChanged`] when any line
    /// no longer fits; in that case (or on any persistence error) no mutation
    /// is visible afterwards.
    fn commit(&self, request: &CommitRequest) -> impl Future<Output = Result<()>> + Send;

    /// Get an order by id.
    fn order(&self, id: &OrderId) -> impl Future<Output = Result<Option<Order>>> + Send;

    /// List all orders, newest first.
    fn orders(&self) -> impl Future<Output = Result<Vec<Order>>> + Send;
}
