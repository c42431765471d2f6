//! Checkout: the atomic conversion of cart + reservations into an order.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::VariantLocks;
use crate::domain::{CustomerDetails, Holder, Order, OrderLine, SessionCart, VariantId};
use crate::error::{CheckoutError, Result};
use crate::store::{CartStore, CatalogStore, CommitRequest, OrderStore, ReservationStore};

/// Drives the `CartPopulated -> StockRevalidated -> Committed | Rejected`
/// state machine.
///
/// Revalidation happens inside the store's commit transaction, with every
/// involved variant lock held, because time has passed since the
/// reservations were admitted. Any line that no longer fits rejects the
/// whole checkout; a rejected or failed commit leaves no visible mutation.
pub struct CheckoutService<S> {
    store: Arc<S>,
    locks: Arc<VariantLocks>,
}

impl<S> CheckoutService<S>
where
    S: CatalogStore + ReservationStore + CartStore + OrderStore,
{
    /// Create a checkout service.
    pub fn new(store: Arc<S>, locks: Arc<VariantLocks>) -> Self {
        Self { store, locks }
    }

    /// Commit the holder's cart as an order.
    ///
    /// On success the order is persisted with copied line snapshots, stock is
    /// decremented, the holder's reservations are released and both cart
    /// representations are cleared.
    ///
    /// # Errors
    /// [`CheckoutError::EmptyCart`] when there is nothing to commit;
    /// [`CheckoutError::StockChanged`] when revalidation finds a line that no
    /// longer fits - in both cases nothing is mutated.
    pub async fn commit(
        &self,
        holder: &Holder,
        session: &mut SessionCart,
        customer: CustomerDetails,
        shipping: Decimal,
    ) -> Result<Order> {
        let (lines, decrements) = self.collect_lines(holder, session).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }

        let order = Order::new(holder.account_id().cloned(), customer, lines, shipping);

        let variant_ids: Vec<VariantId> = decrements.iter().map(|(id, _)| id.clone()).collect();
        let _guards = self.locks.acquire_all(&variant_ids).await;

        self.store
            .commit(&CommitRequest {
                order: order.clone(),
                decrements,
                holders: vec![holder.clone()],
            })
            .await?;

        session.clear();
        info!(code = %order.code, total = %order.total, "order committed");
        Ok(order)
    }

    /// Copy the cart into order lines - snapshot semantics, the order must
    /// stay immune to later catalog edits.
    async fn collect_lines(
        &self,
        holder: &Holder,
        session: &SessionCart,
    ) -> Result<(Vec<OrderLine>, Vec<(VariantId, u32)>)> {
        let mut lines = Vec::new();
        let mut decrements = Vec::new();

        match holder {
            Holder::Account(account) => {
                for line in self.store.lines(account).await? {
                    lines.push(OrderLine {
                        product_name: line.name.clone(),
                        variant_color: line.color.clone(),
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        image_url: line.image_url.clone(),
                    });
                    decrements.push((line.variant_id.clone(), line.quantity));
                }
            }
            Holder::Session(_) => {
                for (variant_id, line) in session.iter() {
                    lines.push(OrderLine {
                        product_name: line.name.clone(),
                        variant_color: line.color.clone(),
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        image_url: line.image_url.clone(),
                    });
                    decrements.push((variant_id.clone(), line.quantity));
                }
            }
        }

        Ok((lines, decrements))
    }
}
