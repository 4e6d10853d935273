//! Category types for product organization.
//!
//! Categories form a tree through `parent_id`. Each category also carries a
//! materialized `path` made of the slugs from the root down to itself
//! (e.g. `"electronics/phones"`), which is unique across the catalog and
//! makes subtree queries a prefix match.

use crate::error::CommerceError;
use crate::ids::CategoryId;
use crate::current_timestamp;
use serde::{Deserialize, Serialize};

/// Separator between slugs in a category path.
pub const PATH_SEPARATOR: char = '/';

/// A product category in the catalog hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique category identifier.
    pub id: CategoryId,
    /// Parent category ID (None for root categories).
    pub parent_id: Option<CategoryId>,
    /// Category name.
    pub name: String,
    /// URL-friendly slug, unique among siblings.
    pub slug: String,
    /// Category description.
    pub description: Option<String>,
    /// Sort order position within parent.
    pub position: i32,
    /// Depth in the hierarchy (0 = root).
    pub level: i32,
    /// Materialized slug path from the root (e.g., "electronics/phones").
    pub path: String,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Category {
    /// Create a new root category.
    pub fn new_root(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        let now = current_timestamp();
        Self {
            id: CategoryId::generate(),
            parent_id: None,
            name: name.into(),
            path: slug.clone(),
            slug,
            description: None,
            position: 0,
            level: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new child category.
    pub fn new_child(parent: &Category, name: impl Into<String>, slug: impl Into<String>) -> Self {
        let mut category = Self::new_root(name, slug);
        category.place_under(Some(parent));
        category
    }

    /// Re-derive `parent_id`, `level` and `path` for a (new) parent.
    pub fn place_under(&mut self, parent: Option<&Category>) {
        self.parent_id = parent.map(|p| p.id.clone());
        self.level = parent.map(|p| p.level + 1).unwrap_or(0);
        self.path = child_path(parent.map(|p| p.path.as_str()), &self.slug);
    }

    /// Check if this is a root category.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this category is an ancestor of another.
    pub fn is_ancestor_of(&self, other: &Category) -> bool {
        is_path_within(&other.path, &self.path) && other.id != self.id
    }

    /// Check if this category is a descendant of another.
    pub fn is_descendant_of(&self, other: &Category) -> bool {
        other.is_ancestor_of(self)
    }

    /// Paths of all ancestors, root first.
    pub fn ancestor_paths(&self) -> Vec<String> {
        let segments: Vec<&str> = self.path.split(PATH_SEPARATOR).collect();
        (1..segments.len())
            .map(|n| segments[..n].join("/"))
            .collect()
    }

    /// Get the breadcrumb depth.
    pub fn depth(&self) -> usize {
        self.path.matches(PATH_SEPARATOR).count()
    }

    /// Check that this category may be moved under `new_parent`.
    ///
    /// Moving a category under itself or one of its own descendants would
    /// create a cycle.
    pub fn validate_move(&self, new_parent: Option<&Category>) -> Result<(), CommerceError> {
        if let Some(parent) = new_parent {
            if parent.id == self.id {
                return Err(CommerceError::InvalidCategoryMove(format!(
                    "{} cannot be its own parent",
                    self.name
                )));
            }
            if self.is_ancestor_of(parent) {
                return Err(CommerceError::InvalidCategoryMove(format!(
                    "{} cannot be moved under its descendant {}",
                    self.name, parent.name
                )));
            }
        }
        Ok(())
    }
}

/// Build the path of a category with `slug` under a parent path.
pub fn child_path(parent_path: Option<&str>, slug: &str) -> String {
    match parent_path {
        Some(parent) => format!("{}{}{}", parent, PATH_SEPARATOR, slug),
        None => slug.to_string(),
    }
}

/// Check whether `path` equals `prefix` or lies below it.
///
/// The test is segment-aware: `"shoes-kids"` is not within `"shoes"`.
pub fn is_path_within(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// Rewrite a descendant path after its ancestor moved from `old_prefix` to
/// `new_prefix`. Returns `None` when `path` is not within `old_prefix`.
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if !is_path_within(path, old_prefix) {
        return None;
    }
    Some(format!("{}{}", new_prefix, &path[old_prefix.len()..]))
}

/// Render the human breadcrumb for `category` (e.g. `"Electronics > Phones"`),
/// resolving ancestor names from `all`.
pub fn breadcrumb(category: &Category, all: &[Category]) -> String {
    let mut names: Vec<&str> = category
        .ancestor_paths()
        .iter()
        .filter_map(|path| all.iter().find(|c| &c.path == path))
        .map(|c| c.name.as_str())
        .collect();
    names.push(&category.name);
    names.join(" > ")
}
