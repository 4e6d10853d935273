//! Checkout module.
//!
//! Contains types for addresses, shop pricing settings and orders.

mod address;
mod order;
mod settings;

pub use address::Address;
pub use order::{
    generate_order_number, normalize_email, CheckoutInput, Order, OrderItem, OrderStatus,
    OrderView,
};
pub use settings::ShopSettings;
