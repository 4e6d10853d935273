//! Listing filters and their SQL.
//!
//! Product conditions are written against the `products` table aliased as `p`.

use crate::catalog::ProductStatus;
use crate::checkout::OrderStatus;
use crate::ids::CategoryId;
use serde::{Deserialize, Serialize};

/// A bound parameter for a filter clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

/// A product listing filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Filter {
    /// Products in a category or any of its descendants.
    Category(CategoryId),
    /// Products in the category at this slug path or below it.
    CategoryPath(String),
    /// Products carrying the tag with this slug.
    Tag(String),
    /// Products with a variant priced within the range (cents).
    PriceRange { min: Option<i64>, max: Option<i64> },
    /// Products with at least one variant in stock.
    InStock,
    Status(ProductStatus),
    Featured(bool),
    /// Substring match on name or description.
    Text(String),
}

impl Filter {
    /// Build SQL WHERE clause component.
    pub fn to_sql(&self) -> (String, Vec<FilterValue>) {
        match self {
            Filter::Category(id) => (
                "p.category_id IN (SELECT d.id FROM categories d JOIN categories c ON c.id = ? \
                 WHERE d.path = c.path OR d.path LIKE c.path || '/%')"
                    .to_string(),
                vec![FilterValue::Text(id.as_str().to_string())],
            ),
            Filter::CategoryPath(path) => (
                "p.category_id IN (SELECT id FROM categories WHERE path = ? OR path LIKE ? ESCAPE '\\')"
                    .to_string(),
                vec![
                    FilterValue::Text(path.clone()),
                    FilterValue::Text(format!("{}/%", escape_like(path))),
                ],
            ),
            Filter::Tag(slug) => (
                "p.id IN (SELECT pt.product_id FROM product_tags pt \
                 JOIN tags t ON t.id = pt.tag_id WHERE t.slug = ?)"
                    .to_string(),
                vec![FilterValue::Text(slug.clone())],
            ),
            Filter::PriceRange { min, max } => {
                let mut clauses = Vec::new();
                let mut values = Vec::new();
                if let Some(min) = min {
                    clauses.push("v.price_cents >= ?");
                    values.push(FilterValue::Int(*min));
                }
                if let Some(max) = max {
                    clauses.push("v.price_cents <= ?");
                    values.push(FilterValue::Int(*max));
                }
                if clauses.is_empty() {
                    return (String::new(), values);
                }
                (
                    format!(
                        "p.id IN (SELECT v.product_id FROM product_variants v WHERE {})",
                        clauses.join(" AND ")
                    ),
                    values,
                )
            }
            Filter::InStock => (
                "p.id IN (SELECT product_id FROM product_variants WHERE inventory > 0)".to_string(),
                vec![],
            ),
            Filter::Status(status) => (
                "p.status = ?".to_string(),
                vec![FilterValue::Text(status.as_str().to_string())],
            ),
            Filter::Featured(featured) => (
                "p.featured = ?".to_string(),
                vec![FilterValue::Int(*featured as i64)],
            ),
            Filter::Text(query) => {
                let pattern = format!("%{}%", escape_like(query));
                (
                    "(p.name LIKE ? ESCAPE '\\' OR p.description LIKE ? ESCAPE '\\')".to_string(),
                    vec![FilterValue::Text(pattern.clone()), FilterValue::Text(pattern)],
                )
            }
        }
    }
}

/// SQL condition selecting orders in a derived status.
pub fn order_status_condition(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Cancelled => "cancelled_at IS NOT NULL",
        OrderStatus::Delivered => "cancelled_at IS NULL AND delivered_at IS NOT NULL",
        OrderStatus::Shipped => {
            "cancelled_at IS NULL AND delivered_at IS NULL AND shipped_at IS NOT NULL"
        }
        OrderStatus::Paid => {
            "cancelled_at IS NULL AND delivered_at IS NULL AND shipped_at IS NULL \
             AND paid_at IS NOT NULL"
        }
        OrderStatus::Pending => {
            "cancelled_at IS NULL AND delivered_at IS NULL AND shipped_at IS NULL \
             AND paid_at IS NULL"
        }
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
