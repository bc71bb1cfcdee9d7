//! Cache store interface and the in-process TTL cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key-value store with per-entry time-to-live.
///
/// Entries for different keys never interfere. Expired entries behave as
/// absent. Implementations must be shareable across tasks.
pub trait CacheStore<V>: Send + Sync {
    /// Live value for `key`, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Store `value` under `key` for `ttl` from now, replacing any previous entry.
    fn insert(&self, key: &str, value: V, ttl: Duration);

    /// Remove the entry for `key`. Returns true if one was present.
    fn delete(&self, key: &str) -> bool;

    /// Lookup, or run `compute` and store its `Ok` value for `ttl`.
    ///
    /// An `Err` from `compute` is handed back and nothing is stored. There is
    /// no single-flight: two concurrent misses on one key both run `compute`
    /// and the later write wins.
    fn fetch<E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> impl Future<Output = Result<V, E>> + Send
    where
        V: Clone + Send,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
    {
        async move {
            if let Some(hit) = self.get(key) {
                tracing::debug!(key, "cache hit");
                return Ok(hit);
            }

            tracing::debug!(key, "cache miss");
            let value = compute().await?;
            self.insert(key, value.clone(), ttl);
            tracing::info!(key, ttl_secs = ttl.as_secs(), "cached fresh value");
            Ok(value)
        }
    }
}

impl<V, T> CacheStore<V> for Arc<T>
where
    T: CacheStore<V> + ?Sized,
{
    fn get(&self, key: &str) -> Option<V> {
        (**self).get(key)
    }

    fn insert(&self, key: &str, value: V, ttl: Duration) {
        (**self).insert(key, value, ttl)
    }

    fn delete(&self, key: &str) -> bool {
        (**self).delete(key)
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Process-local cache; contents are lost on restart.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including ones that expired but were not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<V> CacheStore<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: evict lazily, unless a fresh write landed in between
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        None
    }

    fn insert(&self, key: &str, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }
}
