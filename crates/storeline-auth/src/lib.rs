//! Authentication for Storeline.
//!
//! Provides customer and staff accounts, role-based authorization, argon2
//! password hashing and bearer-token sessions held in the cache.

mod error;
mod password;
mod repository;
mod session;
mod user;

pub use error::AuthError;
pub use password::{PasswordHasher, PasswordPolicy};
pub use repository::{NewUser, UserRepository};
pub use session::{bearer_token, AuthSessions};
pub use storeline_cache::SessionId;
pub use user::{Role, SessionUser, User};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AuthError, AuthSessions, NewUser, PasswordHasher, PasswordPolicy, Role, SessionUser, User,
        UserRepository,
    };
}
