//! E-commerce domain types and logic for Storeline.
//!
//! This crate provides the types and rules shared by the admin dashboard and
//! the storefront:
//!
//! - **Catalog**: Categories (a slug-path tree), products, variants, tags
//! - **Cart**: Shopping cart with line items and pricing
//! - **Promotion**: Coupons and their redemption rules
//! - **Checkout**: Addresses, shop settings, orders and their lifecycle
//! - **Search**: Product and order listing filters, sorting, pagination
//!
//! With the `storage` feature, [`repository`] persists all of the above
//! through `storeline-db`.
//!
//! # Example
//!
//! ```rust,ignore
//! use storeline_commerce::prelude::*;
//!
//! let mut cart = Cart::new(CartOwner::Guest(token), Currency::USD);
//! cart.add_item(&product, &variant, 2)?;
//!
//! let summary = price_cart(&cart, coupon.as_ref(), &settings, now, 0)?;
//! println!("Total: {}", summary.total.display());
//! ```

pub mod error;
pub mod ids;
pub mod money;
pub mod slug;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod promotion;
pub mod search;

#[cfg(feature = "storage")]
pub mod repository;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Get current Unix timestamp.
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};
    pub use crate::slug::{slugify, unique_slug};

    // Catalog
    pub use crate::catalog::{
        Category, CategoryNode, CategoryTree, Product, ProductInput, ProductStatus,
        ProductVariant, Tag, VariantInput,
    };

    // Cart
    pub use crate::cart::{price_cart, Cart, CartItem, CartOwner, CartSummary};

    // Promotion
    pub use crate::promotion::{Coupon, CouponInput, CouponKind, CouponRejection, CouponStatus};

    // Checkout
    pub use crate::checkout::{
        Address, CheckoutInput, Order, OrderItem, OrderStatus, OrderView, ShopSettings,
    };

    // Search
    pub use crate::search::{OrderQuery, Page, ProductQuery, SortOption};
}
