//! Typed key-value cache for Storeline.
//!
//! An in-process store with per-entry expiry. Values are kept as JSON so any
//! `Serialize + DeserializeOwned` type can be cached, and clones of a
//! [`Cache`] share the same entries.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use storeline_cache::{cache_key, Cache};
//!
//! let cache = Cache::new();
//!
//! // Store a value for ten minutes
//! cache.set_with_ttl(&cache_key!("stats", "dashboard"), &stats, Duration::from_secs(600))?;
//!
//! // Retrieve it
//! let stats: Option<DashboardStats> = cache.get(&cache_key!("stats", "dashboard"))?;
//! ```

mod error;
mod kv;
mod session;

pub use error::CacheError;
pub use kv::Cache;
pub use session::{Session, SessionData, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, Session, SessionData, SessionId};
}
