//! Category persistence.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use storeline_db::{params, Db, Statement, Value};
use tracing::info;

use crate::catalog::{breadcrumb, child_path, Category, CategoryTree};
use crate::error::CommerceError;
use crate::ids::CategoryId;
use crate::search::escape_like;
use crate::slug::{slugify, unique_slug};
use crate::current_timestamp;

use super::or_not_found;

const SELECT_CATEGORY: &str = "SELECT id, parent_id, name, slug, description, position, level, \
     path, created_at, updated_at FROM categories";

/// New category form.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CategoryInput {
    pub name: String,
    /// Explicit slug; derived from the name when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub position: Option<i32>,
}

/// Category edit form. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

/// Category persistence.
#[derive(Clone, Debug)]
pub struct CategoryRepository {
    db: Db,
}

impl CategoryRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// All categories, in path order.
    pub async fn list(&self) -> Result<Vec<Category>, CommerceError> {
        let sql = format!("{} ORDER BY path", SELECT_CATEGORY);
        Ok(self.db.query_as(&sql, params![]).await?)
    }

    /// All categories arranged as a tree.
    pub async fn tree(&self) -> Result<CategoryTree, CommerceError> {
        Ok(CategoryTree::build(self.list().await?))
    }

    pub async fn get(&self, id: &CategoryId) -> Result<Category, CommerceError> {
        let sql = format!("{} WHERE id = ?", SELECT_CATEGORY);
        self.db
            .query_one(&sql, params![id.as_str()])
            .await
            .map_err(|e| or_not_found(e, || CommerceError::CategoryNotFound(id.to_string())))
    }

    /// Look up a category by its slug path (e.g. "men/shirts").
    pub async fn get_by_path(&self, path: &str) -> Result<Category, CommerceError> {
        let path = path.trim_matches('/');
        let sql = format!("{} WHERE path = ?", SELECT_CATEGORY);
        self.db
            .query_one(&sql, params![path])
            .await
            .map_err(|e| or_not_found(e, || CommerceError::CategoryNotFound(path.to_string())))
    }

    /// Breadcrumb for a category ("Men > Shirts").
    pub async fn breadcrumb(&self, id: &CategoryId) -> Result<String, CommerceError> {
        let category = self.get(id).await?;
        let ancestors = category.ancestor_paths();
        if ancestors.is_empty() {
            return Ok(category.name);
        }
        let sql = format!(
            "{} WHERE path IN ({})",
            SELECT_CATEGORY,
            super::placeholders(ancestors.len())
        );
        let params: Vec<Value> = ancestors.iter().map(Value::from).collect();
        let chain: Vec<Category> = self.db.query_as(&sql, &params).await?;
        Ok(breadcrumb(&category, &chain))
    }

    /// Create a root or child category.
    ///
    /// The slug is made unique among the new category's siblings.
    pub async fn create(&self, input: CategoryInput) -> Result<Category, CommerceError> {
        let name = required_name(&input.name)?;
        let parent = match &input.parent_id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };

        let base = slugify(input.slug.as_deref().unwrap_or(&name));
        let slug = self.free_sibling_slug(parent.as_ref(), &base, None).await?;

        let mut category = Category::new_root(name, slug);
        category.place_under(parent.as_ref());
        category.description = clean(input.description);
        category.position = input.position.unwrap_or(0);

        self.db
            .execute(
                "INSERT INTO categories (id, parent_id, name, slug, description, position, level, \
                 path, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    category.id.as_str(),
                    category.parent_id.as_ref().map(|p| p.as_str()),
                    &category.name,
                    &category.slug,
                    category.description.as_deref(),
                    category.position,
                    category.level,
                    &category.path,
                    category.created_at,
                    category.updated_at
                ],
            )
            .await?;

        info!(id = %category.id, path = %category.path, "category created");
        Ok(category)
    }

    /// Rename or re-describe a category.
    ///
    /// A new name regenerates the slug unless one is given; when the slug
    /// changes, descendants' paths are rewritten in the same transaction.
    pub async fn update(
        &self,
        id: &CategoryId,
        update: CategoryUpdate,
    ) -> Result<Category, CommerceError> {
        let mut category = self.get(id).await?;
        let old_path = category.path.clone();

        if let Some(name) = &update.name {
            category.name = required_name(name)?;
        }
        let wanted = match (&update.slug, &update.name) {
            (Some(slug), _) => Some(slugify(slug)),
            (None, Some(name)) => Some(slugify(name)),
            (None, None) => None,
        };
        if let Some(base) = wanted.filter(|s| *s != category.slug) {
            let parent = match &category.parent_id {
                Some(parent_id) => Some(self.get(parent_id).await?),
                None => None,
            };
            category.slug = self
                .free_sibling_slug(parent.as_ref(), &base, Some(&category.id))
                .await?;
            category.path = child_path(parent.as_ref().map(|p| p.path.as_str()), &category.slug);
        }
        if update.description.is_some() {
            category.description = clean(update.description);
        }
        if let Some(position) = update.position {
            category.position = position;
        }
        category.updated_at = current_timestamp();

        let mut statements = vec![Statement::new(
            "UPDATE categories SET name = ?, slug = ?, description = ?, position = ?, path = ?, \
             updated_at = ? WHERE id = ?",
            vec![
                category.name.clone().into(),
                category.slug.clone().into(),
                category.description.clone().into(),
                category.position.into(),
                category.path.clone().into(),
                category.updated_at.into(),
                category.id.as_str().into(),
            ],
        )
        .guarded(format!("category {} was removed", category.id))];
        if category.path != old_path {
            statements.push(rebase_descendants(&old_path, &category.path, 0));
        }
        self.db.transaction(statements).await?;

        info!(id = %category.id, path = %category.path, "category updated");
        Ok(category)
    }

    /// Move a category (with its subtree) under a new parent, or to the root.
    pub async fn move_to(
        &self,
        id: &CategoryId,
        new_parent_id: Option<&CategoryId>,
    ) -> Result<Category, CommerceError> {
        let mut category = self.get(id).await?;
        let new_parent = match new_parent_id {
            Some(parent_id) => Some(self.get(parent_id).await?),
            None => None,
        };
        category.validate_move(new_parent.as_ref())?;

        if category.parent_id.as_ref() == new_parent.as_ref().map(|p| &p.id) {
            return Ok(category);
        }

        let old_path = category.path.clone();
        let old_level = category.level;
        category.slug = self
            .free_sibling_slug(new_parent.as_ref(), &category.slug, Some(&category.id))
            .await?;
        category.place_under(new_parent.as_ref());
        category.updated_at = current_timestamp();

        self.db
            .transaction(vec![
                Statement::new(
                    "UPDATE categories SET parent_id = ?, slug = ?, level = ?, path = ?, \
                     updated_at = ? WHERE id = ?",
                    vec![
                        category.parent_id.as_ref().map(|p| p.as_str()).into(),
                        category.slug.clone().into(),
                        category.level.into(),
                        category.path.clone().into(),
                        category.updated_at.into(),
                        category.id.as_str().into(),
                    ],
                )
                .guarded(format!("category {} was removed", category.id)),
                rebase_descendants(&old_path, &category.path, category.level - old_level),
            ])
            .await?;

        info!(id = %category.id, from = %old_path, to = %category.path, "category moved");
        Ok(category)
    }

    /// Delete a category without children. Its products become uncategorized.
    pub async fn delete(&self, id: &CategoryId) -> Result<(), CommerceError> {
        let category = self.get(id).await?;
        let children = self
            .db
            .query_scalar_i64(
                "SELECT COUNT(*) FROM categories WHERE parent_id = ?",
                params![id.as_str()],
            )
            .await?;
        if children > 0 {
            return Err(CommerceError::CategoryHasChildren(category.name));
        }

        self.db
            .transaction(vec![
                Statement::new(
                    "UPDATE products SET category_id = NULL WHERE category_id = ?",
                    vec![id.as_str().into()],
                ),
                Statement::new("DELETE FROM categories WHERE id = ?", vec![id.as_str().into()])
                    .guarded(format!("category {} was removed", id)),
            ])
            .await?;

        info!(id = %id, path = %category.path, "category deleted");
        Ok(())
    }

    /// First of `base`, `base-2`, ... not used by a sibling under `parent`.
    async fn free_sibling_slug(
        &self,
        parent: Option<&Category>,
        base: &str,
        exclude: Option<&CategoryId>,
    ) -> Result<String, CommerceError> {
        #[derive(Deserialize)]
        struct SlugRow {
            id: String,
            slug: String,
        }

        let rows: Vec<SlugRow> = self
            .db
            .query_as(
                "SELECT id, slug FROM categories WHERE parent_id IS ?",
                params![parent.map(|p| p.id.as_str())],
            )
            .await?;
        let taken: HashSet<String> = rows
            .into_iter()
            .filter(|r| exclude.map(|id| id.as_str() != r.id).unwrap_or(true))
            .map(|r| r.slug)
            .collect();
        Ok(unique_slug(base, |s| taken.contains(s)))
    }
}

/// Rewrite every path strictly below `old_prefix` to sit below `new_prefix`.
fn rebase_descendants(old_prefix: &str, new_prefix: &str, level_delta: i32) -> Statement {
    Statement::new(
        "UPDATE categories SET path = ? || substr(path, ?), level = level + ? \
         WHERE path LIKE ? ESCAPE '\\'",
        vec![
            new_prefix.into(),
            (old_prefix.chars().count() as i64 + 1).into(),
            level_delta.into(),
            format!("{}/%", escape_like(old_prefix)).into(),
        ],
    )
}

fn required_name(name: &str) -> Result<String, CommerceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommerceError::ValidationError("name is required".into()));
    }
    Ok(name.to_string())
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
