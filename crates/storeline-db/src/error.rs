//! Database error types.

use thiserror::Error;

/// Errors that can occur when using the database.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open the database.
    #[error("Failed to open database: {0}")]
    OpenError(String),

    /// Failed to execute a query.
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// A unique constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A foreign key, check or not-null constraint was violated.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A guarded statement inside a transaction matched no rows.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Failed to deserialize a row.
    #[error("Deserialization error: {0}")]
    DeserializeError(String),

    /// Type conversion error.
    #[error("Type conversion error: {0}")]
    TypeError(String),

    /// No rows returned when one was expected.
    #[error("No rows returned")]
    NotFound,
}

impl DbError {
    /// Check if this error is a unique-constraint conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::DeserializeError(e.to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match db.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => DbError::Conflict(message),
                    sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::CheckViolation => DbError::Constraint(message),
                    _ => DbError::QueryError(message),
                }
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::TypeError(format!("column {}: {}", index, source))
            }
            other => DbError::QueryError(other.to_string()),
        }
    }
}
