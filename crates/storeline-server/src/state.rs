//! Shared application state.

use std::sync::Arc;

use storeline_auth::{AuthSessions, PasswordHasher, PasswordPolicy, UserRepository};
use storeline_cache::Cache;
use storeline_commerce::repository::Store;
use storeline_db::{Db, DbError};

use crate::config::StorelineConfig;

/// Handles shared by every request. Cheap to clone.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Store,
    pub users: UserRepository,
    pub sessions: AuthSessions,
    pub config: Arc<StorelineConfig>,
}

impl AppState {
    /// Build state over an already-migrated database.
    pub fn new(db: Db, config: StorelineConfig) -> Self {
        Self::with_hasher(db, config, PasswordHasher::default())
    }

    /// Like [`AppState::new`] with custom password hashing costs.
    pub fn with_hasher(db: Db, config: StorelineConfig, hasher: PasswordHasher) -> Self {
        let store = Store::new(db.clone(), config.shop.clone());
        let users = UserRepository::new(
            db,
            hasher,
            PasswordPolicy::new(config.auth.min_password_length),
        );
        let sessions = AuthSessions::new(Cache::new(), config.auth.session_ttl());
        Self {
            store,
            users,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Connect to the configured database, apply the schema and build state.
    pub async fn connect(config: StorelineConfig) -> Result<Self, DbError> {
        let db = Db::connect(&config.database.url, config.database.max_connections).await?;
        db.migrate().await?;
        Ok(Self::new(db, config))
    }
}
