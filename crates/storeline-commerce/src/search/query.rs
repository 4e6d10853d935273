//! Listing query builders.

use crate::catalog::ProductStatus;
use crate::checkout::OrderStatus;
use crate::ids::CategoryId;
use crate::search::filter::{escape_like, order_status_condition};
use crate::search::{Filter, FilterValue};
use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PER_PAGE: i64 = 24;
/// Largest page size a client may request.
pub const MAX_PER_PAGE: i64 = 100;

/// Highest page number; keeps `offset()` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Sort options for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Sort by newest first.
    #[default]
    Newest,
    /// Sort by oldest first.
    Oldest,
    /// Sort by lowest variant price, low to high.
    PriceAsc,
    /// Sort by lowest variant price, high to low.
    PriceDesc,
    /// Sort by name A-Z.
    NameAsc,
    /// Sort by name Z-A.
    NameDesc,
}

impl SortOption {
    /// Get SQL ORDER BY clause.
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOption::Newest => "p.created_at DESC, p.id",
            SortOption::Oldest => "p.created_at ASC, p.id",
            SortOption::PriceAsc => "min_price ASC, p.name",
            SortOption::PriceDesc => "min_price DESC, p.name",
            SortOption::NameAsc => "p.name COLLATE NOCASE ASC, p.id",
            SortOption::NameDesc => "p.name COLLATE NOCASE DESC, p.id",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortOption::Newest => "Newest",
            SortOption::Oldest => "Oldest",
            SortOption::PriceAsc => "Price: Low to High",
            SortOption::PriceDesc => "Price: High to Low",
            SortOption::NameAsc => "Name: A-Z",
            SortOption::NameDesc => "Name: Z-A",
        }
    }
}

/// Product listing query, as sent by the storefront and admin list views.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ProductQuery {
    /// Text search on name and description.
    pub q: Option<String>,
    /// Category, including its descendants.
    pub category_id: Option<CategoryId>,
    /// Category slug path, including its descendants.
    pub category_path: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub status: Option<ProductStatus>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    pub sort: SortOption,
    /// Current page (1-indexed).
    pub page: Option<i64>,
    /// Items per page.
    pub per_page: Option<i64>,
}

impl ProductQuery {
    /// Create a new product query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to what customers may see.
    pub fn storefront(mut self) -> Self {
        self.status = Some(ProductStatus::Active);
        self
    }

    /// Set the text query.
    pub fn with_text(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Set sort option.
    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    /// Set pagination.
    pub fn with_pagination(mut self, page: i64, per_page: i64) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// Page number, at least 1.
    pub fn page(&self) -> i64 {
        clamp_page(self.page)
    }

    /// Page size, clamped to `1..=MAX_PER_PAGE`.
    pub fn per_page(&self) -> i64 {
        clamp_per_page(self.per_page)
    }

    /// Calculate offset for SQL LIMIT/OFFSET.
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    /// Filters implied by the query fields.
    pub fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            filters.push(Filter::Text(q.to_string()));
        }
        if let Some(id) = &self.category_id {
            filters.push(Filter::Category(id.clone()));
        }
        if let Some(path) = self.category_path.as_deref().filter(|p| !p.is_empty()) {
            filters.push(Filter::CategoryPath(path.trim_matches('/').to_string()));
        }
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            filters.push(Filter::Tag(tag.to_string()));
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            filters.push(Filter::PriceRange {
                min: self.min_price,
                max: self.max_price,
            });
        }
        if let Some(status) = self.status {
            filters.push(Filter::Status(status));
        }
        if let Some(featured) = self.featured {
            filters.push(Filter::Featured(featured));
        }
        if self.in_stock == Some(true) {
            filters.push(Filter::InStock);
        }
        filters
    }

    /// Build SQL WHERE clause from filters.
    pub fn build_where_clause(&self) -> (String, Vec<FilterValue>) {
        let mut clauses = Vec::new();
        let mut all_values = Vec::new();

        for filter in self.filters() {
            let (clause, values) = filter.to_sql();
            if !clause.is_empty() {
                clauses.push(format!("({})", clause));
                all_values.extend(values);
            }
        }

        if clauses.is_empty() {
            return ("1=1".to_string(), all_values);
        }
        (clauses.join(" AND "), all_values)
    }

    /// Build the SQL selecting the IDs of one page of matching products.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let (where_clause, values) = self.build_where_clause();
        let sql = format!(
            "SELECT p.id, \
             (SELECT MIN(price_cents) FROM product_variants v WHERE v.product_id = p.id) AS min_price \
             FROM products p WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            where_clause,
            self.sort.to_sql(),
            self.per_page(),
            self.offset()
        );
        (sql, values)
    }

    /// Build count SQL query.
    pub fn build_count_sql(&self) -> (String, Vec<FilterValue>) {
        let (where_clause, values) = self.build_where_clause();
        let sql = format!("SELECT COUNT(*) AS count FROM products p WHERE {}", where_clause);
        (sql, values)
    }
}

/// Admin order listing query.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// Substring of the customer email.
    pub email: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl OrderQuery {
    pub fn page(&self) -> i64 {
        clamp_page(self.page)
    }

    pub fn per_page(&self) -> i64 {
        clamp_per_page(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    /// Build SQL WHERE clause for the `orders` table.
    pub fn build_where_clause(&self) -> (String, Vec<FilterValue>) {
        let mut clauses = vec!["1=1".to_string()];
        let mut values = Vec::new();
        if let Some(status) = self.status {
            clauses.push(format!("({})", order_status_condition(status)));
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            clauses.push("email LIKE ? ESCAPE '\\'".to_string());
            values.push(FilterValue::Text(format!("%{}%", escape_like(&email.to_lowercase()))));
        }
        (clauses.join(" AND "), values)
    }
}

fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).clamp(1, MAX_PAGE)
}

fn clamp_per_page(per_page: Option<i64>) -> i64 {
    per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}
