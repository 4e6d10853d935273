//! Database connection and query execution.

use std::str::FromStr;

use crate::{DbError, QueryResult, Row, Value};
use serde::de::DeserializeOwned;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

/// SQLite database handle.
///
/// Provides type-safe query execution with automatic result deserialization.
/// Cloning is cheap; clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct Db {
    pool: SqlitePool,
}

/// A statement queued for execution inside [`Db::transaction`].
#[derive(Debug, Clone)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Bound parameters.
    pub params: Vec<Value>,
    /// When set, the transaction fails with this message if the statement
    /// affects no rows.
    pub guard: Option<String>,
}

impl Statement {
    /// Create a new statement.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            guard: None,
        }
    }

    /// Require the statement to affect at least one row.
    pub fn guarded(mut self, message: impl Into<String>) -> Self {
        self.guard = Some(message.into());
        self
    }
}

impl Db {
    /// Connect to a SQLite database by URL, creating the file if missing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let db = Db::connect("sqlite://storeline.db", 5).await?;
    /// ```
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbError::OpenError(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database is its own database,
        // so it must stay a single connection that is never recycled.
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        let max_connections = if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
            1
        } else {
            max_connections.max(1)
        };

        let pool = pool_options
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DbError::OpenError(e.to_string()))?;

        debug!(url, max_connections, "database connected");
        Ok(Self { pool })
    }

    /// Open a fresh in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, DbError> {
        let db = Self::connect("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the embedded schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), DbError> {
        for statement in crate::schema::SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        debug!(statements = crate::schema::SCHEMA.len(), "schema applied");
        Ok(())
    }

    /// Execute a SQL statement that doesn't return rows.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// db.execute(
    ///     "UPDATE coupons SET active = ? WHERE id = ?",
    ///     params![false, id.as_str()]
    /// ).await?;
    /// ```
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let result = bind(sqlx::query(sql), params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Execute a SQL query and return raw results.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let rows = bind(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;

        let rows = rows
            .iter()
            .map(Row::from_sqlite)
            .collect::<Result<Vec<_>, _>>()?;
        let columns = rows
            .first()
            .map(|r| r.columns().to_vec())
            .unwrap_or_default();

        Ok(QueryResult::new(columns, rows))
    }

    /// Execute a SQL query and deserialize results into a vector.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let tags: Vec<Tag> = db.query_as("SELECT id, name, slug FROM tags", params![]).await?;
    /// ```
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, DbError> {
        self.query(sql, params).await?.deserialize_all()
    }

    /// Execute a SQL query and return a single row.
    ///
    /// Returns [`DbError::NotFound`] if no rows are returned.
    pub async fn query_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<T, DbError> {
        let result = self.query(sql, params).await?;
        result.first().ok_or(DbError::NotFound)?.deserialize()
    }

    /// Execute a SQL query and return an optional single row.
    pub async fn query_optional<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>, DbError> {
        let result = self.query(sql, params).await?;
        match result.first() {
            Some(row) => Ok(Some(row.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Run a query whose first column is an integer (e.g. `COUNT(*)`).
    pub async fn query_scalar_i64(&self, sql: &str, params: &[Value]) -> Result<i64, DbError> {
        let result = self.query(sql, params).await?;
        let row = result.first().ok_or(DbError::NotFound)?;
        match row.get_index(0) {
            Some(Value::Null) | None => Ok(0),
            Some(v) => v
                .as_integer()
                .ok_or_else(|| DbError::TypeError("scalar is not an integer".to_string())),
        }
    }

    /// Execute statements atomically.
    ///
    /// The transaction is rolled back if any statement fails or a guarded
    /// statement affects no rows.
    pub async fn transaction(&self, statements: Vec<Statement>) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for statement in &statements {
            let result = bind(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *tx)
                .await?;

            if let Some(guard) = &statement.guard {
                if result.rows_affected() == 0 {
                    // Dropping the transaction rolls it back.
                    return Err(DbError::PreconditionFailed(guard.clone()));
                }
            }
        }

        tx.commit().await?;
        debug!(statements = statements.len(), "transaction committed");
        Ok(())
    }

    /// Close the pool, waiting for connections to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Bind parameters to a query in order.
fn bind<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(i) => query.bind(*i),
            Value::Real(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Blob(b) => query.bind(b.clone()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TagRow {
        id: String,
        name: String,
        slug: String,
    }

    #[tokio::test]
    async fn test_execute_and_query() {
        let db = Db::in_memory().await.unwrap();
        let affected = db
            .execute(
                "INSERT INTO tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)",
                params!["t1", "Summer", "summer", 1_i64],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let tags: Vec<TagRow> = db
            .query_as("SELECT id, name, slug FROM tags", params![])
            .await
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, "t1");
        assert_eq!(tags[0].name, "Summer");
        assert_eq!(tags[0].slug, "summer");
    }

    #[tokio::test]
    async fn test_unique_violation_is_conflict() {
        let db = Db::in_memory().await.unwrap();
        let insert = "INSERT INTO tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)";
        db.execute(insert, params!["t1", "Summer", "summer", 1_i64])
            .await
            .unwrap();
        let err = db
            .execute(insert, params!["t2", "Summer", "summer", 1_i64])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_guarded_transaction_rolls_back() {
        let db = Db::in_memory().await.unwrap();
        let result = db
            .transaction(vec![
                Statement::new(
                    "INSERT INTO tags (id, name, slug, created_at) VALUES (?, ?, ?, ?)",
                    vec!["t1".into(), "Summer".into(), "summer".into(), 1_i64.into()],
                ),
                Statement::new("DELETE FROM tags WHERE id = ?", vec!["missing".into()])
                    .guarded("tag missing"),
            ])
            .await;

        assert!(matches!(result, Err(DbError::PreconditionFailed(_))));
        let count = db
            .query_scalar_i64("SELECT COUNT(*) FROM tags", params![])
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Db::in_memory().await.unwrap();
        db.migrate().await.unwrap();
    }
}
