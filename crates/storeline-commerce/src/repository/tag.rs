//! Tag persistence.

use storeline_db::{params, Db};
use tracing::info;

use crate::catalog::Tag;
use crate::error::CommerceError;
use crate::ids::TagId;
use crate::slug::slugify;

use super::or_not_found;

#[derive(Clone, Debug)]
pub struct TagRepository {
    db: Db,
}

impl TagRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, CommerceError> {
        Ok(self
            .db
            .query_as(
                "SELECT id, name, slug, created_at FROM tags ORDER BY name COLLATE NOCASE",
                params![],
            )
            .await?)
    }

    pub async fn get(&self, id: &TagId) -> Result<Tag, CommerceError> {
        self.db
            .query_one(
                "SELECT id, name, slug, created_at FROM tags WHERE id = ?",
                params![id.as_str()],
            )
            .await
            .map_err(|e| or_not_found(e, || CommerceError::TagNotFound(id.to_string())))
    }

    /// Create a tag. Names that slugify to an existing tag's slug conflict.
    pub async fn create(&self, name: &str) -> Result<Tag, CommerceError> {
        if name.trim().is_empty() {
            return Err(CommerceError::ValidationError("tag name is required".into()));
        }
        let tag = Tag::new(name);
        self.db
            .execute(
                "INSERT INTO tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)",
                params![tag.id.as_str(), &tag.name, &tag.slug, tag.created_at],
            )
            .await
            .map_err(|e| conflict_as_taken(e, &tag.name))?;

        info!(id = %tag.id, slug = %tag.slug, "tag created");
        Ok(tag)
    }

    pub async fn rename(&self, id: &TagId, name: &str) -> Result<Tag, CommerceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CommerceError::ValidationError("tag name is required".into()));
        }
        let mut tag = self.get(id).await?;
        tag.name = name.to_string();
        tag.slug = slugify(name);

        self.db
            .execute(
                "UPDATE tags SET name = ?, slug = ? WHERE id = ?",
                params![&tag.name, &tag.slug, id.as_str()],
            )
            .await
            .map_err(|e| conflict_as_taken(e, &tag.name))?;
        Ok(tag)
    }

    /// Delete a tag, detaching it from all products.
    pub async fn delete(&self, id: &TagId) -> Result<(), CommerceError> {
        let deleted = self
            .db
            .execute("DELETE FROM tags WHERE id = ?", params![id.as_str()])
            .await?;
        if deleted == 0 {
            return Err(CommerceError::TagNotFound(id.to_string()));
        }
        info!(id = %id, "tag deleted");
        Ok(())
    }
}

fn conflict_as_taken(err: storeline_db::DbError, name: &str) -> CommerceError {
    if err.is_conflict() {
        CommerceError::Conflict(format!("tag {} already exists", name))
    } else {
        err.into()
    }
}
