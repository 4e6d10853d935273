//! Type-safe SQLite database layer for Storeline.
//!
//! Provides a small, ergonomic API over a pooled SQLite connection with
//! type-safe query results. Rows deserialize into any `serde` type by
//! column name.
//!
//! # Example
//!
//! ```rust,ignore
//! use storeline_db::{Db, params};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Tag {
//!     id: String,
//!     name: String,
//! }
//!
//! let db = Db::connect("sqlite://storeline.db", 5).await?;
//! db.migrate().await?;
//!
//! db.execute(
//!     "INSERT INTO tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)",
//!     params!["t1", "Summer", "summer", 0_i64]
//! ).await?;
//!
//! let tags: Vec<Tag> = db.query_as("SELECT id, name FROM tags", params![]).await?;
//! ```

mod db;
mod error;
mod schema;
mod types;

pub use db::{Db, Statement};
pub use error::DbError;
pub use types::{QueryResult, Row, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{params, Db, DbError, QueryResult, Row, Statement, Value};
}

/// Create a parameter list for SQL queries.
///
/// # Example
///
/// ```rust,ignore
/// use storeline_db::params;
///
/// let params = params!["value1", 42_i64, 3.14];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        &[]
    };
    ($($param:expr),+ $(,)?) => {
        &[$($crate::Value::from($param)),+]
    };
}

/// Serde helper for SQLite's integer booleans.
///
/// Use with `#[serde(deserialize_with = "storeline_db::sql_bool::deserialize")]`.
pub mod sql_bool {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrBool {
        Int(i64),
        Bool(bool),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match IntOrBool::deserialize(deserializer)? {
            IntOrBool::Int(i) => i != 0,
            IntOrBool::Bool(b) => b,
        })
    }
}
