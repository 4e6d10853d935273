//! Session management on top of the cache.

use std::marker::PhantomData;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::{Cache, CacheError};

/// A unique session identifier, handed to clients as a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 24] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Session data stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData<T> {
    pub id: SessionId,
    /// User-defined session data.
    pub data: T,
    /// When the session was created (Unix timestamp).
    pub created_at: u64,
    /// When the session was last used (Unix timestamp).
    pub last_accessed: u64,
}

/// Sessions with a sliding expiry.
///
/// Every successful [`Session::get`] pushes the expiry `ttl` into the future.
///
/// # Example
///
/// ```rust,ignore
/// use storeline_cache::{Cache, Session};
///
/// let sessions = Session::<SessionUser>::new(cache, Duration::from_secs(86_400));
/// let id = sessions.create(&user)?;
/// let user = sessions.get(&id)?;
/// sessions.delete(&id)?;
/// ```
#[derive(Debug, Clone)]
pub struct Session<T> {
    cache: Cache,
    ttl: Duration,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Session<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(cache: Cache, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            _phantom: PhantomData,
        }
    }

    /// Session lifetime after last use.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session holding `data`.
    pub fn create(&self, data: T) -> Result<SessionId, CacheError> {
        let id = SessionId::generate();
        let now = unix_now();
        let session = SessionData {
            id: id.clone(),
            data,
            created_at: now,
            last_accessed: now,
        };
        self.cache
            .set_with_ttl(&session_key(&id), &session, self.ttl)?;
        debug!(session = %redact(&id), "session created");
        Ok(id)
    }

    /// Get session data if the session is live, refreshing its expiry.
    pub fn get(&self, id: &SessionId) -> Result<Option<T>, CacheError> {
        Ok(self.get_full(id)?.map(|s| s.data))
    }

    /// Get the full session record, refreshing its expiry.
    pub fn get_full(&self, id: &SessionId) -> Result<Option<SessionData<T>>, CacheError> {
        let now = unix_now();
        self.cache.update(&session_key(id), Some(self.ttl), |s: &mut SessionData<T>| {
            s.last_accessed = now;
        })
    }

    /// Change the data of a live session. Returns `None` if it has gone.
    pub fn update<F>(&self, id: &SessionId, f: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce(&mut T),
    {
        let now = unix_now();
        let updated = self.cache.update(
            &session_key(id),
            Some(self.ttl),
            |s: &mut SessionData<T>| {
                s.last_accessed = now;
                f(&mut s.data);
            },
        )?;
        Ok(updated.map(|s| s.data))
    }

    /// End a session. Returns whether it was live.
    pub fn delete(&self, id: &SessionId) -> Result<bool, CacheError> {
        let removed = self.cache.delete(&session_key(id))?;
        if removed {
            debug!(session = %redact(id), "session ended");
        }
        Ok(removed)
    }

    /// End every session whose data matches `predicate`. Returns how many ended.
    pub fn delete_where<P>(&self, predicate: P) -> Result<usize, CacheError>
    where
        P: Fn(&T) -> bool,
    {
        let mut ended = 0;
        for key in self.cache.keys(SESSION_PREFIX)? {
            if let Some(session) = self.cache.get::<SessionData<T>>(&key)? {
                if predicate(&session.data) && self.cache.delete(&key)? {
                    ended += 1;
                }
            }
        }
        Ok(ended)
    }

    /// Check if a session is live, without refreshing it.
    pub fn exists(&self, id: &SessionId) -> Result<bool, CacheError> {
        self.cache.exists(&session_key(id))
    }
}

const SESSION_PREFIX: &str = "session:";

fn session_key(id: &SessionId) -> String {
    format!("{}{}", SESSION_PREFIX, id)
}

/// First characters of a token, for logs.
fn redact(id: &SessionId) -> &str {
    let s = id.as_str();
    let end = s.char_indices().nth(10).map_or(s.len(), |(i, _)| i);
    &s[..end]
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
