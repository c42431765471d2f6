//! Application services over the store layer.
//!
//! Cart mutations, the login merge protocol and checkout commit all share
//! the same [`VariantLocks`] table; that table is what turns the advisory
//! "check available then write" pattern into a correct critical section.

mod cart;
mod checkout;
mod locks;
mod merge;

pub use cart::{CartService, CartUpdate};
pub use checkout::CheckoutService;
pub use locks::VariantLocks;
pub use merge::{CartMerger, LoginEvent, MergeReport};
