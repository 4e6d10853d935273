//! Shopping cart and cart pricing.

#[allow(clippy::module_inception)]
mod cart;
mod pricing;

pub use cart::{Cart, CartItem, CartOwner, MAX_QUANTITY_PER_ITEM};
pub use pricing::{price_cart, AppliedCoupon, CartSummary};
