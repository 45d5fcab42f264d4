//! In-memory TTL cache keyed by string.
//!
//! One TTL is fixed at construction and applies to every entry. Entries are superseded on
//! `set`, never merged. The map sits behind a single mutex that is held only for the
//! bookkeeping itself, never across an upstream call.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    inner: Mutex<HashMap<String, CacheEntry<V>>>,
}

/// Team ids per user id.
pub type TeamLookupCache = TtlCache<Vec<String>>;

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut map = self.lock();

        match map.get(key) {
            Some(entry) if now.duration_since(entry.fetched_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value`, replacing any previous entry for `key`.
    ///
    /// Expired entries of other keys are pruned on the way.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut map = self.lock();

        map.retain(|_, entry| now.duration_since(entry.fetched_at) < ttl);
        map.insert(
            key.into(),
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned map is still structurally valid; keep serving.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
