//! Cart and cart item types.

use crate::catalog::{Product, ProductVariant};
use crate::error::CommerceError;
use crate::ids::{CartId, CartItemId, ProductId, UserId, VariantId};
use crate::money::{Currency, Money};
use crate::current_timestamp;
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per cart item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 99;

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CartOwner {
    /// A signed-in customer.
    User(UserId),
    /// An anonymous visitor, keyed by the session token the client sends.
    Guest(String),
}

impl CartOwner {
    /// Key under which the cart is stored.
    pub fn key(&self) -> String {
        match self {
            CartOwner::User(id) => format!("user:{}", id),
            CartOwner::Guest(token) => format!("guest:{}", token),
        }
    }

    /// Parse a stored key back into an owner.
    pub fn from_key(key: &str) -> Option<Self> {
        if let Some(id) = key.strip_prefix("user:") {
            Some(CartOwner::User(UserId::new(id)))
        } else {
            key.strip_prefix("guest:")
                .map(|token| CartOwner::Guest(token.to_string()))
        }
    }
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    pub owner: CartOwner,
    /// Items in the cart, in the order they were added.
    pub items: Vec<CartItem>,
    /// Applied coupon code (one per cart).
    pub coupon_code: Option<String>,
    /// Cart currency.
    pub currency: Currency,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(owner: CartOwner, currency: Currency) -> Self {
        let now = current_timestamp();
        Self {
            id: CartId::generate(),
            owner,
            items: Vec::new(),
            coupon_code: None,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a variant to the cart, merging with an existing line for it.
    ///
    /// Returns an error if:
    /// - the product is not active
    /// - quantity is not positive
    /// - the resulting quantity exceeds [`MAX_QUANTITY_PER_ITEM`] or the stock
    pub fn add_item(
        &mut self,
        product: &Product,
        variant: &ProductVariant,
        quantity: i64,
    ) -> Result<CartItemId, CommerceError> {
        if !product.is_available() || variant.product_id != product.id {
            return Err(CommerceError::ProductUnavailable(product.name.clone()));
        }
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let current = self
            .get_item_by_variant(&variant.id)
            .map(|i| i.quantity)
            .unwrap_or(0);
        let new_quantity = current
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;
        check_quantity(variant, new_quantity)?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.variant_id == variant.id) {
            existing.quantity = new_quantity;
            existing.unit_price = variant.price;
            self.updated_at = current_timestamp();
            return Ok(existing.id.clone());
        }

        let item = CartItem::new(product, variant, quantity);
        let id = item.id.clone();
        self.items.push(item);
        self.updated_at = current_timestamp();
        Ok(id)
    }

    /// Set an item's quantity. A quantity of zero or less removes the item.
    ///
    /// Returns `false` if the item is not in the cart.
    pub fn set_quantity(
        &mut self,
        item_id: &CartItemId,
        quantity: i64,
        variant: &ProductVariant,
    ) -> Result<bool, CommerceError> {
        if quantity <= 0 {
            return Ok(self.remove_item(item_id));
        }
        check_quantity(variant, quantity)?;

        match self.items.iter_mut().find(|i| &i.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                self.updated_at = current_timestamp();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove an item from the cart.
    pub fn remove_item(&mut self, item_id: &CartItemId) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| &i.id != item_id);
        let removed = self.items.len() < len_before;
        if removed {
            self.updated_at = current_timestamp();
        }
        removed
    }

    /// Clear all items and the coupon.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
        self.updated_at = current_timestamp();
    }

    /// Merge another cart into this one (a guest cart at sign-in).
    ///
    /// Quantities for the same variant are summed and capped at
    /// [`MAX_QUANTITY_PER_ITEM`]. The other cart's coupon is kept only if this
    /// cart has none.
    pub fn merge(&mut self, other: Cart) {
        for item in other.items {
            match self.items.iter_mut().find(|i| i.variant_id == item.variant_id) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .saturating_add(item.quantity)
                        .min(MAX_QUANTITY_PER_ITEM);
                }
                None => {
                    let mut item = item;
                    item.quantity = item.quantity.min(MAX_QUANTITY_PER_ITEM);
                    self.items.push(item);
                }
            }
        }
        if self.coupon_code.is_none() {
            self.coupon_code = other.coupon_code;
        }
        self.updated_at = current_timestamp();
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Get number of unique items.
    pub fn unique_item_count(&self) -> usize {
        self.items.len()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by ID.
    pub fn get_item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    /// Get an item by variant ID.
    pub fn get_item_by_variant(&self, variant_id: &VariantId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.variant_id == variant_id)
    }

    /// Sum of all line totals.
    pub fn subtotal(&self) -> Result<Money, CommerceError> {
        self.items
            .iter()
            .try_fold(Money::zero(self.currency), |acc, item| {
                acc.try_add(&item.line_total()?)
            })
    }
}

fn check_quantity(variant: &ProductVariant, quantity: i64) -> Result<(), CommerceError> {
    if quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CommerceError::QuantityExceedsLimit(
            quantity,
            MAX_QUANTITY_PER_ITEM,
        ));
    }
    if !variant.can_fulfill(quantity) {
        return Err(CommerceError::InsufficientInventory {
            sku: variant.sku.clone(),
            requested: quantity,
            available: variant.inventory,
        });
    }
    Ok(())
}

/// A line in the cart, with product details denormalized for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: CartItemId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    /// Variant title (e.g., "Large / Blue").
    pub variant_title: String,
    pub sku: String,
    /// Current unit price of the variant.
    pub unit_price: Money,
    pub quantity: i64,
}

impl CartItem {
    /// Create a cart item for a variant.
    pub fn new(product: &Product, variant: &ProductVariant, quantity: i64) -> Self {
        Self {
            id: CartItemId::generate(),
            variant_id: variant.id.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_slug: product.slug.clone(),
            variant_title: variant.title(),
            sku: variant.sku.clone(),
            unit_price: variant.price,
            quantity,
        }
    }

    /// Unit price times quantity.
    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.unit_price.try_multiply(self.quantity)
    }
}
