//! The shopper cart in its two representations.
//!
//! The *ephemeral* form ([`SessionCart`]) lives in the anonymous browser
//! session and is owned by the caller; the *durable* form ([`CartLine`] rows)
//! lives in the database, one per (account, variant). The cart service keeps
//! a holder's cart lines and reservations in lockstep on every write path.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ProductId, Variant, VariantId};

/// One line of the ephemeral session cart.
///
/// Carries the price snapshot and display fields captured at add time so the
/// UI can render the cart without touching the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLine {
    pub product_id: ProductId,
    pub name: String,
    pub color: String,
    pub image_url: String,
    /// Effective unit price at the moment of add/update.
    pub unit_price: Decimal,
    /// List price, present only when the captured price was discounted.
    pub original_price: Option<Decimal>,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl SessionLine {
    /// Snapshot a variant's current pricing and display data at `quantity`.
    #[must_use]
    pub fn snapshot(variant: &Variant, quantity: u32) -> Self {
        Self {
            product_id: variant.product_id.clone(),
            name: variant.name.clone(),
            color: variant.color.clone(),
            image_url: variant.image_url.clone(),
            unit_price: variant.effective_price(),
            original_price: variant.original_price_if_discounted(),
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Line subtotal at the captured price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The ephemeral cart: a map from variant to line, scoped to one anonymous
/// browser session.
///
/// Serializable so the web layer can round-trip it through its session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCart {
    entries: BTreeMap<VariantId, SessionLine>,
}

impl SessionCart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the line for a variant.
    #[must_use]
    pub fn line(&self, variant_id: &VariantId) -> Option<&SessionLine> {
        self.entries.get(variant_id)
    }

    /// Current quantity for a variant, zero when absent.
    #[must_use]
    pub fn quantity(&self, variant_id: &VariantId) -> u32 {
        self.entries.get(variant_id).map_or(0, |line| line.quantity)
    }

    /// Insert or replace a line.
    pub fn upsert(&mut self, variant_id: VariantId, line: SessionLine) {
        self.entries.insert(variant_id, line);
    }

    /// Remove a line, returning it if present.
    pub fn remove(&mut self, variant_id: &VariantId) -> Option<SessionLine> {
        self.entries.remove(variant_id)
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate lines in variant order.
    pub fn iter(&self) -> impl Iterator<Item = (&VariantId, &SessionLine)> {
        self.entries.iter()
    }

    /// The variants currently in the cart, in deterministic order.
    #[must_use]
    pub fn variant_ids(&self) -> Vec<VariantId> {
        self.entries.keys().cloned().collect()
    }

    /// Total units across all lines (the cart badge count).
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.entries.values().map(|line| line.quantity).sum()
    }
}

/// One line of the durable account cart, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub original_price: Option<Decimal>,
    pub name: String,
    pub color: String,
    pub image_url: String,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Build a durable line from a session line.
    #[must_use]
    pub fn from_session(variant_id: VariantId, line: &SessionLine) -> Self {
        Self {
            variant_id,
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            original_price: line.original_price,
            name: line.name.clone(),
            color: line.color.clone(),
            image_url: line.image_url.clone(),
            added_at: line.added_at,
        }
    }

    /// Project this durable line back into the session mirror.
    #[must_use]
    pub fn to_session_line(&self) -> SessionLine {
        SessionLine {
            product_id: self.product_id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            image_url: self.image_url.clone(),
            unit_price: self.unit_price,
            original_price: self.original_price,
            quantity: self.quantity,
            added_at: self.added_at,
        }
    }

    /// Line subtotal at the captured price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// One rendered line of a cart snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotLine {
    pub variant_id: VariantId,
    pub name: String,
    pub color: String,
    pub image_url: String,
    pub unit_price: Decimal,
    pub original_price: Option<Decimal>,
    pub quantity: u32,
    pub subtotal: Decimal,
}

/// The read-path view of a holder's cart: priced lines plus the names of any
/// lines dropped because their reservation lapsed, so the UI can tell the
/// shopper what disappeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<SnapshotLine>,
    pub total: Decimal,
    pub item_count: u32,
    pub dropped: Vec<String>,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
