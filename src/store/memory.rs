//! In-memory store implementation for testing.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use parking_lot::RwLock;

use super::{CartStore, CatalogStore, CommitRequest, OrderStore, ReservationStore};
use crate::domain::{
    AccountId, CartLine, Holder, Order, OrderId, Reservation, Variant, VariantId,
};
use crate::error::{CheckoutError, Result};

/// In-memory store for testing purposes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    variants: RwLock<HashMap<VariantId, Variant>>,
    reservations: RwLock<HashMap<(VariantId, Holder), Reservation>>,
    cart: RwLock<HashMap<(AccountId, VariantId), CartLine>>,
    orders: RwLock<Vec<Order>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a catalog variant.
    pub fn insert_variant(&self, variant: Variant) {
        self.variants.write().insert(variant.id.clone(), variant);
    }

    /// Current physical stock for a variant, for test assertions.
    pub fn stock_of(&self, variant_id: &VariantId) -> Option<u32> {
        self.variants.read().get(variant_id).map(|v| v.stock)
    }
}

fn active_sum<'a>(
    reservations: impl Iterator<Item = &'a Reservation>,
    variant_id: &VariantId,
    exclude: &[&Holder],
) -> u32 {
    let now = Utc::now();
    reservations
        .filter(|r| {
            r.variant_id == *variant_id && r.is_active(now) && !exclude.contains(&&r.holder)
        })
        .map(|r| r.quantity)
        .sum()
}

impl CatalogStore for MemoryStore {
    async fn variant(&self, id: &VariantId) -> Result<Option<Variant>> {
        Ok(self.variants.read().get(id).cloned())
    }
}

impl ReservationStore for MemoryStore {
    async fn reservation(
        &self,
        variant_id: &VariantId,
        holder: &Holder,
    ) -> Result<Option<Reservation>> {
        Ok(self
            .reservations
            .read()
            .get(&(variant_id.clone(), holder.clone()))
            .cloned())
    }

    async fn reserved_by_others(&self, variant_id: &VariantId, holder: &Holder) -> Result<u32> {
        let reservations = self.reservations.read();
        Ok(active_sum(reservations.values(), variant_id, &[holder]))
    }

    async fn reserved_total(&self, variant_id: &VariantId) -> Result<u32> {
        let reservations = self.reservations.read();
        Ok(active_sum(reservations.values(), variant_id, &[]))
    }

    async fn save(&self, reservation: &Reservation) -> Result<()> {
        self.reservations.write().insert(
            (reservation.variant_id.clone(), reservation.holder.clone()),
            reservation.clone(),
        );
        Ok(())
    }

    async fn release(&self, variant_id: &VariantId, holder: &Holder) -> Result<bool> {
        Ok(self
            .reservations
            .write()
            .remove(&(variant_id.clone(), holder.clone()))
            .is_some())
    }

    async fn re_key(
        &self,
        variant_id: &VariantId,
        old_holder: &Holder,
        new_holder: &Holder,
        merge_quantity: u32,
        hold: Duration,
    ) -> Result<()> {
        let mut reservations = self.reservations.write();
        reservations.remove(&(variant_id.clone(), old_holder.clone()));
        reservations.insert(
            (variant_id.clone(), new_holder.clone()),
            Reservation::new(variant_id.clone(), new_holder.clone(), merge_quantity, hold),
        );
        Ok(())
    }

    async fn prune_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut reservations = self.reservations.write();
        let before = reservations.len();
        reservations.retain(|_, r| r.expires_at > now);
        Ok(before - reservations.len())
    }

    async fn active(&self) -> Result<Vec<Reservation>> {
        let now = Utc::now();
        let reservations = self.reservations.read();
        Ok(reservations
            .values()
            .filter(|r| r.is_active(now))
            .cloned()
            .collect())
    }
}

impl CartStore for MemoryStore {
    async fn line(&self, account: &AccountId, variant_id: &VariantId) -> Result<Option<CartLine>> {
        Ok(self
            .cart
            .read()
            .get(&(account.clone(), variant_id.clone()))
            .cloned())
    }

    async fn lines(&self, account: &AccountId) -> Result<Vec<CartLine>> {
        let cart = self.cart.read();
        let mut lines: Vec<CartLine> = cart
            .iter()
            .filter(|((a, _), _)| a == account)
            .map(|(_, line)| line.clone())
            .collect();
        lines.sort_by(|a, b| a.variant_id.cmp(&b.variant_id));
        Ok(lines)
    }

    async fn save_line(&self, account: &AccountId, line: &CartLine) -> Result<()> {
        self.cart
            .write()
            .insert((account.clone(), line.variant_id.clone()), line.clone());
        Ok(())
    }

    async fn delete_line(&self, account: &AccountId, variant_id: &VariantId) -> Result<bool> {
        Ok(self
            .cart
            .write()
            .remove(&(account.clone(), variant_id.clone()))
            .is_some())
    }
}

impl OrderStore for MemoryStore {
    async fn commit(&self, request: &CommitRequest) -> Result<()> {
        // Single lock scope over every table keeps the commit atomic.
        let mut variants = self.variants.write();
        let mut reservations = self.reservations.write();
        let mut cart = self.cart.write();
        let mut orders = self.orders.write();

        let excluded: Vec<&Holder> = request.holders.iter().collect();

        // Revalidate every line before touching anything.
        for (variant_id, quantity) in &request.decrements {
            let stock = variants.get(variant_id).map_or(0, |v| v.stock);
            let others = active_sum(reservations.values(), variant_id, &excluded);
            let available = stock.saturating_sub(others);
            if *quantity > available {
                return Err(CheckoutError::StockChanged {
                    variant: variant_id.clone(),
                    available,
                }
                .into());
            }
        }

        for (variant_id, quantity) in &request.decrements {
            if let Some(variant) = variants.get_mut(variant_id) {
                variant.stock -= quantity;
            }
            for holder in &request.holders {
                reservations.remove(&(variant_id.clone(), holder.clone()));
            }
        }

        for holder in &request.holders {
            if let Holder::Account(account) = holder {
                cart.retain(|(a, _), _| a != account);
            }
        }

        orders.push(request.order.clone());
        Ok(())
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().iter().find(|o| o.id == *id).cloned())
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().iter().rev().cloned().collect())
    }
}
