//! Cart mutations and the availability-checked reservation upsert.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::VariantLocks;
use crate::domain::{
    CartLine, CartSnapshot, Holder, Reservation, SessionCart, SessionLine, SnapshotLine,
    VariantId,
};
use crate::error::{CartError, Result};
use crate::store::{CartStore, CatalogStore, ReservationStore};

/// Result of a successful cart mutation, surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartUpdate {
    /// The holder's quantity after the write.
    pub quantity: u32,
    /// Units still available to any shopper after the write.
    pub available: u32,
}

/// The shopper-facing cart: keeps the holder's cart representation(s) and
/// reservation in lockstep on every write path.
///
/// Anonymous holders mutate only the caller-owned [`SessionCart`];
/// authenticated holders additionally mirror every write into the durable
/// account cart so it survives the session.
pub struct CartService<S> {
    store: Arc<S>,
    locks: Arc<VariantLocks>,
    hold: Duration,
}

impl<S> CartService<S>
where
    S: CatalogStore + ReservationStore + CartStore,
{
    /// Create a cart service with the given reservation hold duration.
    pub fn new(store: Arc<S>, locks: Arc<VariantLocks>, hold: Duration) -> Self {
        Self { store, locks, hold }
    }

    /// Add `delta` units of a variant to the holder's cart.
    ///
    /// # Errors
    /// Fails with [`CartError::InsufficientStock`] when the combined quantity
    /// exceeds effective availability; in that case neither the cart nor the
    /// reservation changes.
    pub async fn add_item(
        &self,
        holder: &Holder,
        session: &mut SessionCart,
        variant_id: &VariantId,
        delta: u32,
    ) -> Result<CartUpdate> {
        if delta == 0 {
            return Err(CartError::InvalidQuantity { quantity: delta }.into());
        }
        let current = self.current_quantity(holder, session, variant_id).await?;
        self.set_quantity(holder, session, variant_id, current + delta)
            .await
    }

    /// Set the holder's quantity for a variant to an absolute value.
    ///
    /// A quantity of zero is equivalent to [`Self::remove_item`].
    pub async fn update_quantity(
        &self,
        holder: &Holder,
        session: &mut SessionCart,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<CartUpdate> {
        if quantity == 0 {
            self.remove_item(holder, session, variant_id).await?;
            let available = self.effective_available(variant_id, None).await?;
            return Ok(CartUpdate {
                quantity: 0,
                available,
            });
        }
        self.set_quantity(holder, session, variant_id, quantity)
            .await
    }

    /// Remove a variant from the holder's cart and release its reservation.
    ///
    /// Idempotent: removing an absent line is a no-op.
    pub async fn remove_item(
        &self,
        holder: &Holder,
        session: &mut SessionCart,
        variant_id: &VariantId,
    ) -> Result<()> {
        session.remove(variant_id);
        if let Some(account) = holder.account_id() {
            self.store.delete_line(account, variant_id).await?;
        }
        self.store.release(variant_id, holder).await?;
        Ok(())
    }

    /// Read the holder's cart: sweeps expired reservations first, drops any
    /// line whose backing reservation lapsed, and reports the dropped product
    /// names so the UI can notify the shopper.
    pub async fn snapshot(&self, holder: &Holder, session: &mut SessionCart) -> Result<CartSnapshot> {
        let pruned = self.store.prune_expired().await?;
        if pruned > 0 {
            debug!(pruned, "swept expired reservations");
        }

        let now = Utc::now();
        let mut dropped = Vec::new();
        let mut lines = Vec::new();

        match holder {
            Holder::Session(_) => {
                for variant_id in session.variant_ids() {
                    let active = self
                        .store
                        .reservation(&variant_id, holder)
                        .await?
                        .is_some_and(|r| r.is_active(now));
                    if !active {
                        if let Some(line) = session.remove(&variant_id) {
                            dropped.push(line.name);
                        }
                        continue;
                    }
                    if let Some(line) = session.line(&variant_id) {
                        lines.push(snapshot_line(&variant_id, line));
                    }
                }
            }
            Holder::Account(account) => {
                session.clear();
                for line in self.store.lines(account).await? {
                    let active = self
                        .store
                        .reservation(&line.variant_id, holder)
                        .await?
                        .is_some_and(|r| r.is_active(now));
                    if !active {
                        self.store.delete_line(account, &line.variant_id).await?;
                        dropped.push(line.name);
                        continue;
                    }
                    // Mirror the surviving durable cart into the session so
                    // the browser sees consistent totals immediately.
                    let mirror = line.to_session_line();
                    lines.push(snapshot_line(&line.variant_id, &mirror));
                    session.upsert(line.variant_id.clone(), mirror);
                }
            }
        }

        let total = lines.iter().map(|line| line.subtotal).sum();
        let item_count = lines.iter().map(|line| line.quantity).sum();
        Ok(CartSnapshot {
            lines,
            total,
            item_count,
            dropped,
        })
    }

    /// Effective available stock for a variant: physical stock minus active
    /// holds, optionally excluding one holder's own hold.
    pub async fn effective_available(
        &self,
        variant_id: &VariantId,
        excluding: Option<&Holder>,
    ) -> Result<u32> {
        let variant = self
            .store
            .variant(variant_id)
            .await?
            .ok_or_else(|| CartError::VariantNotFound {
                variant: variant_id.clone(),
            })?;
        let reserved = match excluding {
            Some(holder) => self.store.reserved_by_others(variant_id, holder).await?,
            None => self.store.reserved_total(variant_id).await?,
        };
        Ok(variant.stock.saturating_sub(reserved))
    }

    async fn current_quantity(
        &self,
        holder: &Holder,
        session: &SessionCart,
        variant_id: &VariantId,
    ) -> Result<u32> {
        match holder {
            Holder::Account(account) => Ok(self
                .store
                .line(account, variant_id)
                .await?
                .map_or(0, |line| line.quantity)),
            Holder::Session(_) => Ok(session.quantity(variant_id)),
        }
    }

    /// The availability-checked upsert: admission, reservation write and cart
    /// mirror move together or not at all.
    async fn set_quantity(
        &self,
        holder: &Holder,
        session: &mut SessionCart,
        variant_id: &VariantId,
        requested: u32,
    ) -> Result<CartUpdate> {
        let variant = self
            .store
            .variant(variant_id)
            .await?
            .ok_or_else(|| CartError::VariantNotFound {
                variant: variant_id.clone(),
            })?;

        // Critical section: check-and-write must not interleave per variant.
        let _guard = self.locks.acquire(variant_id).await;

        let others = self.store.reserved_by_others(variant_id, holder).await?;
        let available = variant.stock.saturating_sub(others);
        if requested > available {
            return Err(CartError::InsufficientStock {
                requested,
                available,
            }
            .into());
        }

        let previous = self.store.reservation(variant_id, holder).await?;
        let reservation =
            Reservation::new(variant_id.clone(), holder.clone(), requested, self.hold);
        self.store.save(&reservation).await?;

        let line = SessionLine::snapshot(&variant, requested);
        if let Some(account) = holder.account_id() {
            let durable = CartLine::from_session(variant_id.clone(), &line);
            if let Err(err) = self.store.save_line(account, &durable).await {
                // Keep cart and reservation in lockstep: put the reservation
                // back the way it was before surfacing the failure.
                let restored = match previous {
                    Some(prev) => self.store.save(&prev).await,
                    None => self.store.release(variant_id, holder).await.map(|_| ()),
                };
                if let Err(restore_err) = restored {
                    warn!(
                        variant = %variant_id,
                        error = %restore_err,
                        "failed to restore reservation after cart write failure"
                    );
                }
                return Err(err);
            }
        }
        session.upsert(variant_id.clone(), line);

        Ok(CartUpdate {
            quantity: requested,
            available: available - requested,
        })
    }
}

fn snapshot_line(variant_id: &VariantId, line: &SessionLine) -> SnapshotLine {
    SnapshotLine {
        variant_id: variant_id.clone(),
        name: line.name.clone(),
        color: line.color.clone(),
        image_url: line.image_url.clone(),
        unit_price: line.unit_price,
        original_price: line.original_price,
        quantity: line.quantity,
        subtotal: line.unit_price * Decimal::from(line.quantity),
    }
}
