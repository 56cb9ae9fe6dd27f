//! In-memory TTL store backed by `DashMap` for concurrent access.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::store::{Fresh, TtlStore};

/// A single cached value with its expiration time.
struct CacheEntry {
    value: Value,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn remaining(&self, now: Instant) -> Duration {
        match self.expires_at {
            Some(at) => at.saturating_duration_since(now),
            None => Duration::MAX,
        }
    }
}

/// Thread-safe volatile store with per-entry time-to-live.
///
/// Uses the monotonic clock, so nothing survives a restart. Expired entries
/// are lazily evicted on the next `get` for that key.
#[derive(Default)]
pub struct MemoryStore {
    store: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl TtlStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Fresh> {
        let now = Instant::now();
        {
            let entry = self.store.get(key)?;
            let remaining = entry.remaining(now);
            if !remaining.is_zero() {
                return Some(Fresh {
                    value: entry.value.clone(),
                    remaining,
                });
            }
        }
        // Re-checked so a value stored since the read above is kept.
        self.store
            .remove_if(key, |_, entry| entry.remaining(now).is_zero());
        None
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }
}
