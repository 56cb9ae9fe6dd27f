//! TTL cache with per-key single-flight production.
//!
//! On a miss, callers for the same key queue on that key's async mutex and
//! re-check the store once they hold it, so only the first one runs the
//! producer. Callers for different keys never wait on each other.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::ProduceError;
use crate::store::{Fresh, KvStore, TtlStore};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached {
    pub value: Value,
    /// `true` when the value came from the store rather than this call's producer.
    pub from_cache: bool,
    /// Time left before the value expires. Equals the requested TTL for fresh values.
    pub remaining: Duration,
}

impl Cached {
    fn hit(fresh: Fresh) -> Self {
        Self {
            value: fresh.value,
            from_cache: true,
            remaining: fresh.remaining,
        }
    }
}

/// Single-flight TTL cache over a [`TtlStore`].
///
/// Construct one per process and share it behind an `Arc`. Failed
/// productions are never stored, and there is no retry at this layer.
pub struct SingleFlightCache<S = KvStore> {
    store: S,
    /// One lock per key ever requested. Entries are never removed.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlightCache<KvStore> {
    /// Opens a durable cache backed by the JSON file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(KvStore::new(path))
    }
}

impl<S: TtlStore> SingleFlightCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Plain lookup with no single-flight coordination.
    pub fn get(&self, key: &str) -> Option<Fresh> {
        self.store.get(key)
    }

    /// Plain store with no single-flight coordination.
    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.store.set(key, value, ttl);
    }

    /// Number of keys that have a lock in the registry.
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(key) {
            return Arc::clone(lock.value());
        }
        // The entry API holds the shard lock, so racing callers get the same mutex.
        Arc::clone(self.locks.entry(key.to_string()).or_default().value())
    }

    /// Returns the live value for `key`, or runs `producer` to create it.
    ///
    /// At most one producer runs per key at a time; callers that queued
    /// behind it get its value with `from_cache = true`. A producer error is
    /// returned unchanged and nothing is stored.
    pub async fn get_or_produce<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Cached, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(fresh) = self.store.get(key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(Cached::hit(fresh));
        }

        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        if let Some(fresh) = self.store.get(key) {
            tracing::debug!("Cache hit for {} after waiting", key);
            return Ok(Cached::hit(fresh));
        }

        tracing::debug!("Cache miss for {}, calling producer", key);
        let value = producer().await?;
        self.store.set(key, value.clone(), ttl);
        Ok(Cached {
            value,
            from_cache: false,
            remaining: ttl,
        })
    }

    /// [`get_or_produce`](Self::get_or_produce) with the producer bounded by `limit`.
    ///
    /// Running out of time counts as a producer failure: nothing is stored
    /// and the next caller for the key gets to try again.
    pub async fn get_or_produce_within<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        limit: Duration,
        producer: F,
    ) -> Result<Cached, ProduceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.get_or_produce(key, ttl, || async move {
            match tokio::time::timeout(limit, producer()).await {
                Ok(result) => result.map_err(ProduceError::Producer),
                Err(_) => {
                    tracing::warn!("Producer for {} timed out after {:?}", key, limit);
                    Err(ProduceError::Timeout(limit))
                }
            }
        })
        .await
    }
}
