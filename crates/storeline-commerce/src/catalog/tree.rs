//! Category tree assembly.

use std::collections::HashMap;

use crate::catalog::category::{is_path_within, Category};
use crate::ids::CategoryId;
use serde::Serialize;

/// A category with its children, for navigation menus and admin trees.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// A category as it appears in a flattened select list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlatCategory {
    pub id: CategoryId,
    pub name: String,
    pub path: String,
    pub depth: usize,
}

/// The full category forest.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct CategoryTree {
    pub roots: Vec<CategoryNode>,
}

impl CategoryTree {
    /// Build the tree from a flat list.
    ///
    /// Siblings are ordered by `(position, name)`. A category whose parent is
    /// missing from the list is treated as a root.
    pub fn build(categories: Vec<Category>) -> Self {
        let known: Vec<CategoryId> = categories.iter().map(|c| c.id.clone()).collect();
        let mut by_parent: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();

        for category in categories {
            let parent = category
                .parent_id
                .clone()
                .filter(|parent| known.contains(parent));
            by_parent.entry(parent).or_default().push(category);
        }

        Self {
            roots: Self::attach(None, &mut by_parent),
        }
    }

    fn attach(
        parent: Option<CategoryId>,
        by_parent: &mut HashMap<Option<CategoryId>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        let mut siblings = by_parent.remove(&parent).unwrap_or_default();
        siblings.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));

        siblings
            .into_iter()
            .map(|category| {
                let children = Self::attach(Some(category.id.clone()), by_parent);
                CategoryNode { category, children }
            })
            .collect()
    }

    /// Number of categories in the tree.
    pub fn len(&self) -> usize {
        fn count(nodes: &[CategoryNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first listing with indentation depth, in tree order.
    pub fn flatten(&self) -> Vec<FlatCategory> {
        fn walk(nodes: &[CategoryNode], depth: usize, out: &mut Vec<FlatCategory>) {
            for node in nodes {
                out.push(FlatCategory {
                    id: node.category.id.clone(),
                    name: node.category.name.clone(),
                    path: node.category.path.clone(),
                    depth,
                });
                walk(&node.children, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.roots, 0, &mut out);
        out
    }
}

/// IDs of every category strictly below `root` in `categories`.
pub fn descendant_ids(root: &Category, categories: &[Category]) -> Vec<CategoryId> {
    categories
        .iter()
        .filter(|c| c.id != root.id && is_path_within(&c.path, &root.path))
        .map(|c| c.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Category> {
        let mut clothing = Category::new_root("Clothing", "clothing");
        clothing.position = 1;
        let electronics = Category::new_root("Electronics", "electronics");
        let phones = Category::new_child(&electronics, "Phones", "phones");
        let mut laptops = Category::new_child(&electronics, "Laptops", "laptops");
        laptops.position = 0;
        let android = Category::new_child(&phones, "Android", "android");
        vec![clothing, android, phones, laptops, electronics]
    }

    #[test]
    fn test_build_orders_siblings() {
        let tree = CategoryTree::build(sample());
        assert_eq!(tree.len(), 5);
        let names: Vec<&str> = tree.roots.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(names, vec!["Electronics", "Clothing"]);

        let children: Vec<&str> = tree.roots[0]
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(children, vec!["Laptops", "Phones"]);
        assert_eq!(tree.roots[0].children[1].children[0].category.name, "Android");
    }

    #[test]
    fn test_orphan_becomes_root() {
        let parent = Category::new_root("Gone", "gone");
        let orphan = Category::new_child(&parent, "Orphan", "orphan");
        let tree = CategoryTree::build(vec![orphan]);
        assert_eq!(tree.roots.len(), 1);
    }

    #[test]
    fn test_flatten_depths() {
        let flat = CategoryTree::build(sample()).flatten();
        let rows: Vec<(&str, usize)> = flat.iter().map(|f| (f.name.as_str(), f.depth)).collect();
        assert_eq!(
            rows,
            vec![
                ("Electronics", 0),
                ("Laptops", 1),
                ("Phones", 1),
                ("Android", 2),
                ("Clothing", 0)
            ]
        );
    }

    #[test]
    fn test_descendant_ids() {
        let all = sample();
        let electronics = all.iter().find(|c| c.slug == "electronics").unwrap();
        assert_eq!(descendant_ids(electronics, &all).len(), 3);
        let clothing = all.iter().find(|c| c.slug == "clothing").unwrap();
        assert!(descendant_ids(clothing, &all).is_empty());
    }
}
