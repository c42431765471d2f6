//! Purchasable SKUs and their pricing rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ProductId, VariantId};

/// A purchasable SKU: one color variant of a catalog product.
///
/// Owned by the catalog service; this crate reads it and decrements `stock`
/// only at checkout commit. Price snapshots on cart and order lines are
/// captured from here at write time and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// Display name of the parent product.
    pub name: String,
    /// Display color of this variant.
    pub color: String,
    pub image_url: String,
    /// Regular catalog price.
    pub list_price: Decimal,
    /// Promotional price, when the product is on sale.
    pub sale_price: Option<Decimal>,
    /// Physical units on hand.
    pub stock: u32,
}

impl Variant {
    /// The price a shopper pays right now: the sale price when present and
    /// lower than the list price, else the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale < self.list_price => sale,
            _ => self.list_price,
        }
    }

    /// The list price, only when a discount is actually in effect.
    ///
    /// Mirrored onto cart lines so the UI can render a strike-through price.
    #[must_use]
    pub fn original_price_if_discounted(&self) -> Option<Decimal> {
        match self.sale_price {
            Some(sale) if sale < self.list_price => Some(self.list_price),
            _ => None,
        }
    }

    /// True when a discount is in effect.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.original_price_if_discounted().is_some()
    }
}
