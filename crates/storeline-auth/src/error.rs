//! Authentication errors.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No session, or the session expired.
    #[error("authentication required")]
    Unauthenticated,

    /// Insufficient permissions.
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// User not found.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Email already registered.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Password too weak.
    #[error("password too weak: {0}")]
    WeakPassword(String),

    /// Malformed input such as an invalid email address.
    #[error("validation error: {0}")]
    Validation(String),

    /// An admin tried to delete or demote their own account.
    #[error("{0}")]
    SelfModification(String),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(#[from] storeline_cache::CacheError),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] storeline_db::DbError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials | AuthError::Unauthenticated)
    }

    /// Check if this is a permission error.
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            AuthError::InsufficientPermissions | AuthError::SelfModification(_)
        )
    }
}

impl From<storeline_commerce::CommerceError> for AuthError {
    fn from(e: storeline_commerce::CommerceError) -> Self {
        match e {
            storeline_commerce::CommerceError::ValidationError(msg) => AuthError::Validation(msg),
            other => AuthError::Internal(other.to_string()),
        }
    }
}
