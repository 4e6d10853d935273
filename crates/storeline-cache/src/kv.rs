//! Key-value store with automatic serialization and expiry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::CacheError;

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Type-safe in-process cache.
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. Expired entries read as missing and
/// are dropped on the next write to the same key or by [`Cache::purge_expired`].
#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Cache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let user: Option<SessionUser> = cache.get("session:abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let entries = self.read()?;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                Ok(Some(serde_json::from_slice(&entry.bytes)?))
            }
            _ => Ok(None),
        }
    }

    /// Set a value that never expires.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.insert(key, value, None)
    }

    /// Set a value that expires after `ttl`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// cache.set_with_ttl("session:abc", &user, Duration::from_secs(3600))?;
    /// ```
    pub fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.insert(key, value, Some(Instant::now() + ttl))
    }

    fn insert<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expires_at: Option<Instant>,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.write()?
            .insert(key.to_string(), Entry { bytes, expires_at });
        Ok(())
    }

    /// Read, modify and write back a live value under one lock.
    ///
    /// Returns the new value, or `None` when the key is missing or expired
    /// (in which case nothing is written). A `ttl` of `Some` restarts the
    /// entry's expiry.
    pub fn update<T, F>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        f: F,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let now = Instant::now();
        let mut entries = self.write()?;
        let Some(entry) = entries.get_mut(key).filter(|e| e.is_live(now)) else {
            return Ok(None);
        };

        let mut value: T = serde_json::from_slice(&entry.bytes)?;
        f(&mut value);
        entry.bytes = serde_json::to_vec(&value)?;
        if let Some(ttl) = ttl {
            entry.expires_at = Some(now + ttl);
        }
        Ok(Some(value))
    }

    /// Delete a value from the cache. Returns whether a live value was removed.
    pub fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.write()?.remove(key);
        Ok(removed.is_some_and(|e| e.is_live(Instant::now())))
    }

    /// Check if a live key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        Ok(self.read()?.get(key).is_some_and(|e| e.is_live(now)))
    }

    /// Live keys starting with `prefix`, sorted.
    pub fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .read()?
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Delete every live key starting with `prefix`. Returns how many went.
    pub fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.write()?;
        let before = entries.len();
        let mut live_removed = 0;
        entries.retain(|k, e| {
            let hit = k.starts_with(prefix);
            if hit && e.is_live(now) {
                live_removed += 1;
            }
            !hit
        });
        debug!(prefix, removed = before - entries.len(), "cache prefix cleared");
        Ok(live_removed)
    }

    /// Drop expired entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "expired cache entries dropped");
        }
        Ok(purged)
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        Ok(self.read()?.values().filter(|e| e.is_live(now)).count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .read()
            .map_err(|e| CacheError::StoreError(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .write()
            .map_err(|e| CacheError::StoreError(e.to_string()))
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("session", token);
/// // Returns "session:abc123"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    #[test]
    fn test_set_get_delete() {
        let cache = Cache::new();
        assert_eq!(cache.get::<Counter>("c").unwrap(), None);

        cache.set("c", &Counter { hits: 1 }).unwrap();
        assert_eq!(cache.get::<Counter>("c").unwrap(), Some(Counter { hits: 1 }));
        assert!(cache.exists("c").unwrap());

        assert!(cache.delete("c").unwrap());
        assert!(!cache.delete("c").unwrap());
        assert!(!cache.exists("c").unwrap());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = Cache::new();
        let other = cache.clone();
        other.set("shared", &"yes").unwrap();
        assert_eq!(cache.get::<String>("shared").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn test_expiry() {
        let cache = Cache::new();
        cache
            .set_with_ttl("short", &1u32, Duration::from_millis(10))
            .unwrap();
        cache.set("long", &2u32).unwrap();
        assert_eq!(cache.len().unwrap(), 2);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get::<u32>("short").unwrap(), None);
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert_eq!(cache.get::<u32>("long").unwrap(), Some(2));
    }

    #[test]
    fn test_update_in_place() {
        let cache = Cache::new();
        let missing = cache
            .update("n", None, |c: &mut Counter| c.hits += 1)
            .unwrap();
        assert_eq!(missing, None);

        cache.set("n", &Counter { hits: 1 }).unwrap();
        let updated = cache
            .update("n", None, |c: &mut Counter| c.hits += 1)
            .unwrap();
        assert_eq!(updated, Some(Counter { hits: 2 }));
        assert_eq!(cache.get::<Counter>("n").unwrap(), Some(Counter { hits: 2 }));
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let cache = Cache::new();
        cache.set("n", &"text").unwrap();
        assert!(matches!(
            cache.get::<Counter>("n"),
            Err(CacheError::SerializeError(_))
        ));
    }

    #[test]
    fn test_prefix_operations() {
        let cache = Cache::new();
        cache.set(&cache_key!("session", "b"), &1u8).unwrap();
        cache.set(&cache_key!("session", "a"), &1u8).unwrap();
        cache.set(&cache_key!("stats", 1), &1u8).unwrap();

        assert_eq!(
            cache.keys("session:").unwrap(),
            vec!["session:a".to_string(), "session:b".to_string()]
        );
        assert_eq!(cache.delete_prefix("session:").unwrap(), 2);
        assert_eq!(cache.keys("").unwrap(), vec!["stats:1".to_string()]);
    }
}
