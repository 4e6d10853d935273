//! Product tags.

use crate::ids::TagId;
use crate::slug::slugify;
use crate::current_timestamp;
use serde::{Deserialize, Serialize};

/// A free-form label attached to products ("summer", "organic", ...).
///
/// Tag names are unique case-insensitively, enforced through the slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: i64,
}

impl Tag {
    /// Create a tag, deriving the slug from the name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        Self {
            id: TagId::generate(),
            slug: slugify(&name),
            name,
            created_at: current_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_slug() {
        let tag = Tag::new("  Summer Sale ");
        assert_eq!(tag.name, "Summer Sale");
        assert_eq!(tag.slug, "summer-sale");
        assert_eq!(Tag::new("summer sale").slug, tag.slug);
    }
}
