//! Finalized orders produced by checkout commit.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountId, OrderId};

/// Shopper contact and shipping details collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub address: String,
}

/// One order line, copied (not referenced) from the cart at commit time.
///
/// Snapshot semantics: later catalog edits must never retroactively alter a
/// historical order, so name, color, price and image are frozen here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_name: String,
    pub variant_color: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub image_url: String,
}

impl OrderLine {
    /// Line subtotal at the committed price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A finalized order: the atomic conversion of cart + reservations into a
/// permanent sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing order code, unique per order.
    pub code: String,
    pub created_at: DateTime<Utc>,
    /// Grand total including shipping.
    pub total: Decimal,
    /// The account that placed the order, when authenticated.
    pub placed_by: Option<AccountId>,
    pub customer: CustomerDetails,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Assemble a new order from committed lines.
    ///
    /// `total = subtotal + shipping`; the id and code are generated here.
    #[must_use]
    pub fn new(
        placed_by: Option<AccountId>,
        customer: CustomerDetails,
        lines: Vec<OrderLine>,
        shipping: Decimal,
    ) -> Self {
        let created_at = Utc::now();
        let subtotal: Decimal = lines.iter().map(OrderLine::subtotal).sum();
        Self {
            id: OrderId::new(),
            code: generate_code(created_at),
            created_at,
            total: subtotal + shipping,
            placed_by,
            customer,
            lines,
        }
    }

    /// Sum of line subtotals, excluding shipping.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }

    /// Shipping portion of the total, never negative.
    #[must_use]
    pub fn shipping_cost(&self) -> Decimal {
        let subtotal = self.subtotal();
        if self.total >= subtotal {
            self.total - subtotal
        } else {
            Decimal::ZERO
        }
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

/// Generate a human-facing order code: `SR-<ddmmyy>-<HHMMSS>-<suffix>`.
///
/// The random suffix keeps the unique constraint honest when two orders
/// commit within the same second.
#[must_use]
pub fn generate_code(at: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("SR-{}-{:04}", at.format("%d%m%y-%H%M%S"), suffix)
}
