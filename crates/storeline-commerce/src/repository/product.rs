//! Product persistence.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use storeline_db::{params, Db, DbError, Statement, Value};
use tracing::{debug, info};

use crate::catalog::{
    reconcile_variants, Product, ProductInput, ProductStatus, ProductVariant, Tag,
};
use crate::error::CommerceError;
use crate::ids::{CategoryId, ProductId, TagId, VariantId};
use crate::money::{Currency, Money};
use crate::search::{escape_like, Page, ProductQuery};
use crate::slug::{slugify, unique_slug};
use crate::current_timestamp;

use super::{bind_values, placeholders};

const SELECT_PRODUCT: &str = "SELECT id, name, slug, description, status, category_id, featured, \
     created_at, updated_at FROM products";

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: Option<String>,
    status: String,
    category_id: Option<CategoryId>,
    #[serde(deserialize_with = "storeline_db::sql_bool::deserialize")]
    featured: bool,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Deserialize)]
struct VariantRow {
    id: VariantId,
    product_id: ProductId,
    sku: String,
    size: Option<String>,
    color: Option<String>,
    material: Option<String>,
    price_cents: i64,
    compare_at_cents: Option<i64>,
    inventory: i64,
    position: i32,
}

impl VariantRow {
    fn into_variant(self, currency: Currency) -> ProductVariant {
        ProductVariant {
            id: self.id,
            product_id: self.product_id,
            sku: self.sku,
            size: self.size,
            color: self.color,
            material: self.material,
            price: Money::new(self.price_cents, currency),
            compare_at_price: self.compare_at_cents.map(|c| Money::new(c, currency)),
            inventory: self.inventory,
            position: self.position,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductTagRow {
    product_id: ProductId,
    id: TagId,
    name: String,
    slug: String,
    created_at: i64,
}

/// Product persistence.
#[derive(Clone, Debug)]
pub struct ProductRepository {
    db: Db,
    currency: Currency,
}

impl ProductRepository {
    pub fn new(db: Db, currency: Currency) -> Self {
        Self { db, currency }
    }

    /// Load products with their variants and tags, in the order of `ids`.
    pub async fn load_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, CommerceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let marks = placeholders(ids.len());
        let params: Vec<Value> = ids.iter().map(|id| id.as_str().into()).collect();

        let rows: Vec<ProductRow> = self
            .db
            .query_as(&format!("{} WHERE id IN ({})", SELECT_PRODUCT, marks), &params)
            .await?;
        let variants: Vec<VariantRow> = self
            .db
            .query_as(
                &format!(
                    "SELECT id, product_id, sku, size, color, material, price_cents, \
                     compare_at_cents, inventory, position FROM product_variants \
                     WHERE product_id IN ({}) ORDER BY position, sku",
                    marks
                ),
                &params,
            )
            .await?;
        let tags: Vec<ProductTagRow> = self
            .db
            .query_as(
                &format!(
                    "SELECT pt.product_id, t.id, t.name, t.slug, t.created_at FROM product_tags pt \
                     JOIN tags t ON t.id = pt.tag_id WHERE pt.product_id IN ({}) ORDER BY t.name",
                    marks
                ),
                &params,
            )
            .await?;

        let mut variants_by_product: HashMap<ProductId, Vec<ProductVariant>> = HashMap::new();
        for row in variants {
            variants_by_product
                .entry(row.product_id.clone())
                .or_default()
                .push(row.into_variant(self.currency));
        }
        let mut tags_by_product: HashMap<ProductId, Vec<Tag>> = HashMap::new();
        for row in tags {
            tags_by_product.entry(row.product_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
                slug: row.slug,
                created_at: row.created_at,
            });
        }

        let mut by_id: HashMap<ProductId, Product> = rows
            .into_iter()
            .map(|row| {
                let product = Product {
                    variants: variants_by_product.remove(&row.id).unwrap_or_default(),
                    tags: tags_by_product.remove(&row.id).unwrap_or_default(),
                    id: row.id.clone(),
                    name: row.name,
                    slug: row.slug,
                    description: row.description,
                    status: ProductStatus::parse(&row.status).unwrap_or_default(),
                    category_id: row.category_id,
                    featured: row.featured,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                };
                (row.id, product)
            })
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub async fn get(&self, id: &ProductId) -> Result<Product, CommerceError> {
        self.load_many(std::slice::from_ref(id))
            .await?
            .pop()
            .ok_or_else(|| CommerceError::ProductNotFound(id.to_string()))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, CommerceError> {
        #[derive(Deserialize)]
        struct IdRow {
            id: ProductId,
        }
        let row: Option<IdRow> = self
            .db
            .query_optional("SELECT id FROM products WHERE slug = ?", params![slug])
            .await?;
        match row {
            Some(row) => self.get(&row.id).await,
            None => Err(CommerceError::ProductNotFound(slug.to_string())),
        }
    }

    /// Load a variant together with its product.
    pub async fn get_variant(
        &self,
        variant_id: &VariantId,
    ) -> Result<(Product, ProductVariant), CommerceError> {
        #[derive(Deserialize)]
        struct OwnerRow {
            product_id: ProductId,
        }
        let row: Option<OwnerRow> = self
            .db
            .query_optional(
                "SELECT product_id FROM product_variants WHERE id = ?",
                params![variant_id.as_str()],
            )
            .await?;
        let row = row.ok_or_else(|| CommerceError::VariantNotFound(variant_id.to_string()))?;
        let product = self.get(&row.product_id).await?;
        let variant = product
            .variant(variant_id)
            .cloned()
            .ok_or_else(|| CommerceError::VariantNotFound(variant_id.to_string()))?;
        Ok((product, variant))
    }

    /// One page of products matching `query`.
    pub async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, CommerceError> {
        #[derive(Deserialize)]
        struct IdRow {
            id: ProductId,
        }

        let (count_sql, count_values) = query.build_count_sql();
        let total = self
            .db
            .query_scalar_i64(&count_sql, &bind_values(count_values))
            .await?;

        let (sql, values) = query.build_sql();
        let ids: Vec<IdRow> = self.db.query_as(&sql, &bind_values(values)).await?;
        let ids: Vec<ProductId> = ids.into_iter().map(|r| r.id).collect();
        let items = self.load_many(&ids).await?;

        debug!(total, page = query.page(), "products listed");
        Ok(Page::new(items, total, query.page(), query.per_page()))
    }

    /// Create a product with its variants and tags.
    pub async fn create(&self, mut input: ProductInput) -> Result<Product, CommerceError> {
        input.normalize();
        input.validate()?;
        self.check_references(&input).await?;

        let base = slugify(input.slug.as_deref().unwrap_or(&input.name));
        let slug = self.free_slug(&base, None).await?;

        let mut product = Product::new(input.name.clone(), slug);
        product.description = input.description.clone();
        product.status = input.status;
        product.category_id = input.category_id.clone();
        product.featured = input.featured;
        product.variants = input
            .variants
            .iter()
            .enumerate()
            .map(|(position, v)| {
                v.to_variant(
                    VariantId::generate(),
                    product.id.clone(),
                    position as i32,
                    self.currency,
                )
            })
            .collect();

        let mut statements = vec![Statement::new(
            "INSERT INTO products (id, name, slug, description, status, category_id, featured, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                product.id.as_str().into(),
                product.name.clone().into(),
                product.slug.clone().into(),
                product.description.clone().into(),
                product.status.as_str().into(),
                product.category_id.as_ref().map(|c| c.as_str()).into(),
                product.featured.into(),
                product.created_at.into(),
                product.updated_at.into(),
            ],
        )];
        statements.extend(product.variants.iter().map(|v| insert_variant(v, product.created_at)));
        statements.extend(tag_links(&product.id, &input.tag_ids));

        self.db.transaction(statements).await?;
        info!(
            id = %product.id,
            slug = %product.slug,
            variants = product.variants.len(),
            "product created"
        );
        self.get(&product.id).await
    }

    /// Overwrite a product from the edit form.
    ///
    /// Variants are reconciled against the form and tags are replaced. The
    /// slug only changes when one is given explicitly.
    pub async fn update(
        &self,
        id: &ProductId,
        mut input: ProductInput,
    ) -> Result<Product, CommerceError> {
        input.normalize();
        input.validate()?;
        let existing = self.get(id).await?;
        self.check_references(&input).await?;

        let slug = match input.slug.as_deref() {
            Some(slug) if slugify(slug) != existing.slug => {
                self.free_slug(&slugify(slug), Some(id)).await?
            }
            _ => existing.slug.clone(),
        };
        let now = current_timestamp();
        let changes = reconcile_variants(&existing.variants, &input.variants);

        let mut statements = vec![Statement::new(
            "UPDATE products SET name = ?, slug = ?, description = ?, status = ?, category_id = ?, \
             featured = ?, updated_at = ? WHERE id = ?",
            vec![
                input.name.clone().into(),
                slug.into(),
                input.description.clone().into(),
                input.status.as_str().into(),
                input.category_id.as_ref().map(|c| c.as_str()).into(),
                input.featured.into(),
                now.into(),
                id.as_str().into(),
            ],
        )
        .guarded(format!("product {} was removed", id))];

        for variant_id in &changes.delete {
            statements.push(Statement::new(
                "DELETE FROM product_variants WHERE id = ?",
                vec![variant_id.as_str().into()],
            ));
        }
        // Park kept SKUs on the variant ID first so SKUs can move between variants.
        for (variant_id, _, _) in &changes.update {
            statements.push(Statement::new(
                "UPDATE product_variants SET sku = id WHERE id = ?",
                vec![variant_id.as_str().into()],
            ));
        }
        for (variant_id, position, form) in &changes.update {
            statements.push(Statement::new(
                "UPDATE product_variants SET sku = ?, size = ?, color = ?, material = ?, \
                 price_cents = ?, compare_at_cents = ?, inventory = ?, position = ?, updated_at = ? \
                 WHERE id = ?",
                vec![
                    form.sku.clone().into(),
                    form.size.clone().into(),
                    form.color.clone().into(),
                    form.material.clone().into(),
                    form.price_cents.into(),
                    form.compare_at_cents.into(),
                    form.inventory.into(),
                    (*position).into(),
                    now.into(),
                    variant_id.as_str().into(),
                ],
            ));
        }
        for (position, form) in &changes.insert {
            let variant =
                form.to_variant(VariantId::generate(), id.clone(), *position, self.currency);
            statements.push(insert_variant(&variant, now));
        }

        statements.push(Statement::new(
            "DELETE FROM product_tags WHERE product_id = ?",
            vec![id.as_str().into()],
        ));
        statements.extend(tag_links(id, &input.tag_ids));

        self.db.transaction(statements).await?;
        info!(
            id = %id,
            updated = changes.update.len(),
            inserted = changes.insert.len(),
            deleted = changes.delete.len(),
            "product updated"
        );
        self.get(id).await
    }

    /// Delete a product. Variants go with it; order history keeps its snapshots.
    pub async fn delete(&self, id: &ProductId) -> Result<(), CommerceError> {
        // Databases created before order_items.product_id had a foreign key
        // need the explicit detach.
        let result = self
            .db
            .transaction(vec![
                Statement::new(
                    "UPDATE order_items SET product_id = NULL WHERE product_id = ?",
                    vec![id.as_str().into()],
                ),
                Statement::new("DELETE FROM products WHERE id = ?", vec![id.as_str().into()])
                    .guarded(format!("product {} not found", id)),
            ])
            .await;
        match result {
            Ok(()) => {}
            Err(DbError::PreconditionFailed(_)) => {
                return Err(CommerceError::ProductNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        info!(id = %id, "product deleted");
        Ok(())
    }

    /// Fail with a not-found error if the form references a missing category or tag.
    async fn check_references(&self, input: &ProductInput) -> Result<(), CommerceError> {
        if let Some(category_id) = &input.category_id {
            let found = self
                .db
                .query_scalar_i64(
                    "SELECT COUNT(*) FROM categories WHERE id = ?",
                    params![category_id.as_str()],
                )
                .await?;
            if found == 0 {
                return Err(CommerceError::CategoryNotFound(category_id.to_string()));
            }
        }

        let wanted: HashSet<&TagId> = input.tag_ids.iter().collect();
        for tag_id in wanted {
            let found = self
                .db
                .query_scalar_i64(
                    "SELECT COUNT(*) FROM tags WHERE id = ?",
                    params![tag_id.as_str()],
                )
                .await?;
            if found == 0 {
                return Err(CommerceError::TagNotFound(tag_id.to_string()));
            }
        }
        Ok(())
    }

    async fn free_slug(
        &self,
        base: &str,
        exclude: Option<&ProductId>,
    ) -> Result<String, CommerceError> {
        #[derive(Deserialize)]
        struct SlugRow {
            id: ProductId,
            slug: String,
        }
        let rows: Vec<SlugRow> = self
            .db
            .query_as(
                "SELECT id, slug FROM products WHERE slug = ? OR slug LIKE ? ESCAPE '\\'",
                params![base, format!("{}-%", escape_like(base))],
            )
            .await?;
        let taken: HashSet<String> = rows
            .into_iter()
            .filter(|r| Some(&r.id) != exclude)
            .map(|r| r.slug)
            .collect();
        Ok(unique_slug(base, |s| taken.contains(s)))
    }
}

fn insert_variant(variant: &ProductVariant, now: i64) -> Statement {
    Statement::new(
        "INSERT INTO product_variants (id, product_id, sku, size, color, material, price_cents, \
         compare_at_cents, inventory, position, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            variant.id.as_str().into(),
            variant.product_id.as_str().into(),
            variant.sku.clone().into(),
            variant.size.clone().into(),
            variant.color.clone().into(),
            variant.material.clone().into(),
            variant.price.amount_cents.into(),
            variant.compare_at_price.map(|m| m.amount_cents).into(),
            variant.inventory.into(),
            variant.position.into(),
            now.into(),
            now.into(),
        ],
    )
}

fn tag_links(product_id: &ProductId, tag_ids: &[TagId]) -> Vec<Statement> {
    let unique: HashSet<&TagId> = tag_ids.iter().collect();
    unique
        .into_iter()
        .map(|tag_id| {
            Statement::new(
                "INSERT INTO product_tags (product_id, tag_id) VALUES (?, ?)",
                vec![product_id.as_str().into(), tag_id.as_str().into()],
            )
        })
        .collect()
}
