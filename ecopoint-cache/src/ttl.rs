//! Key/value store with per-entry expiry.

use crate::read::CacheRead;
use crate::scope::UserScope;
use crate::stats::{CacheStats, Counters};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use ecopoint_core::{Clock, Timestamp, UserId};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    cached_at: Timestamp,
    expires_at: Timestamp,
}

/// In-memory TTL cache.
///
/// Owned by the composition root and shared through `Arc`. All operations are
/// infallible and purely in-memory.
#[derive(Debug)]
pub struct TtlCache<V = serde_json::Value> {
    entries: DashMap<String, CacheEntry<V>>,
    scope: UserScope,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            scope: UserScope::new(),
            clock,
            counters: Counters::default(),
        }
    }

    /// Store `value` under `key`, replacing any existing entry.
    ///
    /// The entry expires `ttl` from now. Very large TTLs saturate at the
    /// maximum representable instant.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = self.clock.now();
        let delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                cached_at: now,
                expires_at,
            },
        );
    }

    /// Read a live value. Expired entries are removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(CacheRead::into_value)
    }

    /// Like [`TtlCache::get`], keeping the entry's age metadata.
    pub fn get_entry(&self, key: &str) -> Option<CacheRead<V>> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if now <= entry.expires_at {
                Counters::bump(&self.counters.hits);
                return Some(CacheRead::new(
                    entry.value.clone(),
                    entry.cached_at,
                    entry.expires_at,
                ));
            }
        } else {
            Counters::bump(&self.counters.misses);
            return None;
        }

        // Expired. Re-check under the write lock in case a concurrent set
        // replaced the entry in between.
        if self
            .entries
            .remove_if(key, |_, entry| now > entry.expires_at)
            .is_some()
        {
            Counters::bump(&self.counters.expirations);
            tracing::trace!(cache_key = key, "Cache entry expired");
        }
        Counters::bump(&self.counters.misses);
        None
    }

    /// Remove one entry, or every entry when `key` is `None`.
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.entries.remove(key);
            }
            None => self.entries.clear(),
        }
    }

    /// Make `user_id` the cache's active user.
    ///
    /// If another user was active, every entry is dropped first. Calling it
    /// repeatedly with the same user leaves the contents untouched. Returns
    /// whether a purge happened.
    pub fn clear_user_scoped(&self, user_id: &UserId) -> bool {
        let purged = self.scope.switch_to(user_id, || self.entries.clear());
        if purged {
            Counters::bump(&self.counters.user_purges);
            tracing::info!(user_id = %user_id, "Active user changed, cache purged");
        }
        purged
    }

    pub fn last_user_id(&self) -> Option<UserId> {
        self.scope.last_user_id()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len() as u64)
    }
}
