//! Time-bounded snapshot cache.
//!
//! Entries remember when they were fetched and how long they stay valid. The
//! current time is always passed in, so staleness is a pure function of the
//! entry and the clock reading.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::debug;

pub const DEFAULT_TTL_SECS: u64 = 300;
const MAX_TTL_SECS: u64 = 366 * 24 * 60 * 60;

pub fn ttl_from_secs(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at,
            ttl,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// An entry is stale once `ttl` has elapsed since it was fetched. A clock
    /// reading earlier than the fetch time never makes it stale.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) >= self.ttl
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotCache<T> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&T> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_stale(now))
            .map(|entry| entry.value())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T, now: DateTime<Utc>) {
        self.entries
            .insert(key.into(), CacheEntry::new(value, now, self.ttl));
    }

    /// Drops the entry for `key`. Returns whether one existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// success. Failures are never cached. The flag reports a cache hit.
    pub fn get_or_try_fetch<E, F>(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<(T, bool), E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(key, now) {
            debug!("Cache hit for {key}");
            return Ok((value.clone(), true));
        }
        let value = fetch()?;
        self.insert(key, value.clone(), now);
        Ok((value, false))
    }
}
