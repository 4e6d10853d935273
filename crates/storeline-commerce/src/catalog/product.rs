//! Product and variant types.

use std::collections::HashSet;

use crate::catalog::Tag;
use crate::error::CommerceError;
use crate::ids::{CategoryId, ProductId, TagId, VariantId};
use crate::money::{Currency, Money};
use crate::current_timestamp;
use serde::{Deserialize, Serialize};

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Product is in draft mode, not visible to customers.
    #[default]
    Draft,
    /// Product is active and visible.
    Active,
    /// Product is archived, not visible but data preserved.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ProductStatus::Draft),
            "active" => Some(ProductStatus::Active),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// URL-friendly slug (unique).
    pub slug: String,
    /// Full description.
    pub description: Option<String>,
    /// Product visibility status.
    pub status: ProductStatus,
    /// Category this product is filed under.
    pub category_id: Option<CategoryId>,
    /// Shown on the storefront home page.
    pub featured: bool,
    /// Tags for filtering.
    pub tags: Vec<Tag>,
    /// Purchasable variants, ordered by position.
    pub variants: Vec<ProductVariant>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Product {
    /// Create a new draft product without variants.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = current_timestamp();
        Self {
            id: ProductId::generate(),
            name: name.into(),
            slug: slug.into(),
            description: None,
            status: ProductStatus::Draft,
            category_id: None,
            featured: false,
            tags: Vec::new(),
            variants: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the product is visible and purchasable on the storefront.
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Lowest and highest variant price.
    pub fn price_range(&self) -> Option<(Money, Money)> {
        let min = self.variants.iter().map(|v| v.price).min_by_key(|m| m.amount_cents)?;
        let max = self.variants.iter().map(|v| v.price).max_by_key(|m| m.amount_cents)?;
        Some((min, max))
    }

    /// Units on hand across all variants.
    pub fn total_inventory(&self) -> i64 {
        self.variants.iter().map(|v| v.inventory).sum()
    }

    /// Check if any variant can be bought.
    pub fn is_in_stock(&self) -> bool {
        self.variants.iter().any(|v| v.is_in_stock())
    }

    /// Find a variant by ID.
    pub fn variant(&self, id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }
}

/// A product variant (a size/color/material combination with its own SKU).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    /// Unique variant identifier.
    pub id: VariantId,
    /// Parent product ID.
    pub product_id: ProductId,
    /// Stock keeping unit for this variant (unique).
    pub sku: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    /// Price of this variant.
    pub price: Money,
    /// Compare-at price (original price for showing discounts).
    pub compare_at_price: Option<Money>,
    /// Units on hand.
    pub inventory: i64,
    /// Sort order position.
    pub position: i32,
}

impl ProductVariant {
    /// Create a new variant.
    pub fn new(product_id: ProductId, sku: impl Into<String>, price: Money) -> Self {
        Self {
            id: VariantId::generate(),
            product_id,
            sku: sku.into(),
            size: None,
            color: None,
            material: None,
            price,
            compare_at_price: None,
            inventory: 0,
            position: 0,
        }
    }

    /// Display title built from the variant options (e.g. "Large / Blue").
    pub fn title(&self) -> String {
        let parts: Vec<&str> = [&self.size, &self.color, &self.material]
            .into_iter()
            .filter_map(|o| o.as_deref())
            .filter(|s| !s.trim().is_empty())
            .collect();

        if parts.is_empty() {
            "Default".to_string()
        } else {
            parts.join(" / ")
        }
    }

    /// Check if this variant is in stock.
    pub fn is_in_stock(&self) -> bool {
        self.inventory > 0
    }

    /// Check if `quantity` units can be sold.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        quantity > 0 && self.inventory >= quantity
    }

    /// Check if stock is at or below the low-stock threshold.
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.inventory <= threshold
    }

    /// Check if this variant is on sale (has a higher compare-at price).
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price
            .map(|cap| cap.amount_cents > self.price.amount_cents)
            .unwrap_or(false)
    }

    /// Whole-percent saving against the compare-at price, if on sale.
    pub fn discount_percentage(&self) -> Option<i64> {
        let cap = self.compare_at_price?;
        if cap.amount_cents <= self.price.amount_cents {
            return None;
        }
        let savings = cap.amount_cents - self.price.amount_cents;
        Some(savings * 100 / cap.amount_cents)
    }
}

/// Product form payload from the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProductInput {
    pub name: String,
    /// Explicit slug; derived from the name when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub category_id: Option<CategoryId>,
    pub featured: bool,
    pub tag_ids: Vec<TagId>,
    pub variants: Vec<VariantInput>,
}

/// A variant row in the product form.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct VariantInput {
    /// Set when editing an existing variant.
    pub id: Option<VariantId>,
    pub sku: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub price_cents: i64,
    pub compare_at_cents: Option<i64>,
    pub inventory: i64,
}

impl ProductInput {
    /// Trim text fields and drop blank optional values.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.slug = blank_to_none(self.slug.take());
        self.description = blank_to_none(self.description.take());
        for variant in &mut self.variants {
            variant.sku = variant.sku.trim().to_string();
            variant.size = blank_to_none(variant.size.take());
            variant.color = blank_to_none(variant.color.take());
            variant.material = blank_to_none(variant.material.take());
        }
    }

    /// Validate the form.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.name.trim().is_empty() {
            return Err(CommerceError::ValidationError("name is required".into()));
        }
        if self.variants.is_empty() {
            return Err(CommerceError::ValidationError(
                "at least one variant is required".into(),
            ));
        }

        let mut skus = HashSet::new();
        for variant in &self.variants {
            let sku = variant.sku.trim();
            if sku.is_empty() {
                return Err(CommerceError::ValidationError("variant SKU is required".into()));
            }
            if !skus.insert(sku.to_uppercase()) {
                return Err(CommerceError::ValidationError(format!(
                    "duplicate SKU {}",
                    sku
                )));
            }
            if variant.price_cents < 0 {
                return Err(CommerceError::ValidationError(format!(
                    "price of {} cannot be negative",
                    sku
                )));
            }
            if variant.inventory < 0 {
                return Err(CommerceError::ValidationError(format!(
                    "inventory of {} cannot be negative",
                    sku
                )));
            }
            if let Some(compare_at) = variant.compare_at_cents {
                if compare_at <= variant.price_cents {
                    return Err(CommerceError::ValidationError(format!(
                        "compare-at price of {} must exceed its price",
                        sku
                    )));
                }
            }
        }
        Ok(())
    }
}

impl VariantInput {
    /// Build a variant for `product_id` at the given position.
    pub fn to_variant(
        &self,
        id: VariantId,
        product_id: ProductId,
        position: i32,
        currency: Currency,
    ) -> ProductVariant {
        ProductVariant {
            id,
            product_id,
            sku: self.sku.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
            material: self.material.clone(),
            price: Money::new(self.price_cents, currency),
            compare_at_price: self.compare_at_cents.map(|c| Money::new(c, currency)),
            inventory: self.inventory,
            position,
        }
    }
}

/// Changes needed to bring stored variants in line with a submitted form.
#[derive(Debug, Default, PartialEq)]
pub struct VariantChanges {
    /// Existing variants to overwrite, with their new position.
    pub update: Vec<(VariantId, i32, VariantInput)>,
    /// New variants with their position.
    pub insert: Vec<(i32, VariantInput)>,
    /// Variants no longer present in the form.
    pub delete: Vec<VariantId>,
}

/// Reconcile stored variants against the submitted form rows.
///
/// Rows with the ID of an existing variant update it; rows without an ID, or
/// with an ID that does not belong to the product, are inserted; existing
/// variants absent from the form are deleted.
pub fn reconcile_variants(existing: &[ProductVariant], inputs: &[VariantInput]) -> VariantChanges {
    let mut changes = VariantChanges::default();
    let mut kept = HashSet::new();

    for (position, input) in inputs.iter().enumerate() {
        let position = position as i32;
        match input.id.as_ref().filter(|id| existing.iter().any(|v| &v.id == *id)) {
            Some(id) => {
                kept.insert(id.clone());
                changes.update.push((id.clone(), position, input.clone()));
            }
            None => changes.insert.push((position, input.clone())),
        }
    }

    changes.delete = existing
        .iter()
        .filter(|v| !kept.contains(&v.id))
        .map(|v| v.id.clone())
        .collect();
    changes
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
