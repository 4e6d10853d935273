//! Commerce error types.

use thiserror::Error;

use crate::promotion::CouponRejection;

/// Errors that can occur in e-commerce operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Variant not found.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Tag not found.
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Coupon not found.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Category still has child categories.
    #[error("Category {0} has child categories")]
    CategoryHasChildren(String),

    /// Category cannot be moved under itself or one of its descendants.
    #[error("Invalid category move: {0}")]
    InvalidCategoryMove(String),

    /// A unique value (slug, SKU, code, email) is already in use.
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Product or variant cannot be purchased.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    /// Insufficient inventory.
    #[error("Insufficient inventory for {sku}: requested {requested}, available {available}")]
    InsufficientInventory {
        sku: String,
        requested: i64,
        available: i64,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Checkout attempted with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Coupon exists but cannot be used.
    #[error("Coupon cannot be applied: {0}")]
    CouponRejected(CouponRejection),

    /// Order status change not allowed from the current status.
    #[error("Invalid order transition from {from} to {to}")]
    InvalidOrderTransition { from: String, to: String },

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CommerceError {
    /// Check if this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CommerceError::ProductNotFound(_)
                | CommerceError::VariantNotFound(_)
                | CommerceError::CategoryNotFound(_)
                | CommerceError::TagNotFound(_)
                | CommerceError::CouponNotFound(_)
                | CommerceError::OrderNotFound(_)
                | CommerceError::ItemNotInCart(_)
        )
    }
}

#[cfg(feature = "storage")]
impl From<storeline_db::DbError> for CommerceError {
    fn from(e: storeline_db::DbError) -> Self {
        match e {
            storeline_db::DbError::Conflict(msg)
            | storeline_db::DbError::PreconditionFailed(msg) => CommerceError::Conflict(msg),
            other => CommerceError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}
