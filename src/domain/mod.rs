//! Storefront-agnostic domain types: identities, holders, variants,
//! reservations, carts and orders.

mod cart;
mod holder;
mod id;
mod order;
mod reservation;
mod variant;

// Core identifiers
pub use id::{AccountId, OrderId, ProductId, SessionKey, VariantId};

// Holder abstraction
pub use holder::{Holder, HolderKind};

// Catalog and inventory
pub use variant::Variant;

// Reservations
pub use reservation::{Reservation, DEFAULT_HOLD_HOURS};

// Cart, both representations
pub use cart::{CartLine, CartSnapshot, SessionCart, SessionLine, SnapshotLine};

// Orders
pub use order::{generate_code, CustomerDetails, Order, OrderLine};
