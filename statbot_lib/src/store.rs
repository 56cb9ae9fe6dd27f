//! Durable key-value store with per-entry expiry.
//!
//! Entries live in memory once the backing JSON file has been read and every
//! mutation is written straight back with an atomic temp-file rename. The
//! file layout is:
//!
//! ```json
//! { "<key>": { "expires_at": 1767225600.5, "value": <any JSON> } }
//! ```
//!
//! `expires_at` is wall-clock epoch seconds so entries stay meaningful
//! across restarts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::CacheError;
use crate::persist;

/// A live value together with the time it has left.
#[derive(Debug, Clone, PartialEq)]
pub struct Fresh {
    pub value: Value,
    pub remaining: Duration,
}

/// Backing store for [`SingleFlightCache`](crate::cache::SingleFlightCache).
pub trait TtlStore: Send + Sync {
    /// Returns the value for `key` if present and unexpired, dropping it if expired.
    fn get(&self, key: &str) -> Option<Fresh>;

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// Metadata for one live entry, as reported by [`KvStore::entries`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    pub key: String,
    /// Expiry as epoch seconds.
    pub expires_at: f64,
    pub remaining: Duration,
}

struct StoredEntry {
    expires_at: f64,
    value: Value,
}

impl StoredEntry {
    fn is_live(&self, now: f64) -> bool {
        now < self.expires_at
    }

    fn remaining(&self, now: f64) -> Duration {
        Duration::try_from_secs_f64(self.expires_at - now).unwrap_or(Duration::MAX)
    }

    /// Parses one persisted record, rejecting anything without a numeric
    /// `expires_at` and a `value`.
    fn from_json(record: &Value) -> Option<Self> {
        let record = record.as_object()?;
        let expires_at = record.get("expires_at")?.as_f64()?;
        let value = record.get("value")?.clone();
        Some(Self { expires_at, value })
    }
}

#[derive(Serialize)]
struct PersistedEntry<'a> {
    expires_at: f64,
    value: &'a Value,
}

type Entries = BTreeMap<String, StoredEntry>;

/// Current wall-clock time as epoch seconds.
pub(crate) fn epoch_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// JSON-file backed expiring key-value store.
///
/// The file is read lazily on first access and never re-read afterwards. A
/// missing or corrupt file starts the store empty without touching the file;
/// malformed or already-expired records are skipped individually.
///
/// Writes are best-effort through [`TtlStore::set`]: a failed flush is logged
/// and the in-memory state stays authoritative. Use [`KvStore::try_set`] or
/// [`KvStore::persist`] to observe persistence errors.
pub struct KvStore {
    path: PathBuf,
    /// `None` until the file has been loaded.
    entries: Mutex<Option<Entries>>,
}

impl KvStore {
    /// Creates a store backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> R {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entries = guard.get_or_insert_with(|| load(&self.path));
        f(entries)
    }

    fn flush(&self, entries: &Entries) -> Result<(), CacheError> {
        let persisted: BTreeMap<&str, PersistedEntry<'_>> = entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.as_str(),
                    PersistedEntry {
                        expires_at: entry.expires_at,
                        value: &entry.value,
                    },
                )
            })
            .collect();
        persist::write_json_atomic(&self.path, &persisted)
    }

    fn flush_best_effort(&self, entries: &Entries) {
        self.warn_on_failure(self.flush(entries));
    }

    fn warn_on_failure(&self, result: Result<(), CacheError>) {
        if let Err(e) = result {
            tracing::warn!("Failed to persist cache to {}: {}", self.path.display(), e);
        }
    }

    /// Applies `f` and flushes if it reports a change.
    fn mutate<R>(&self, f: impl FnOnce(&mut Entries) -> (R, bool)) -> (R, Result<(), CacheError>) {
        self.with_entries(|entries| {
            let (out, changed) = f(entries);
            let flushed = if changed { self.flush(entries) } else { Ok(()) };
            (out, flushed)
        })
    }

    /// Like [`TtlStore::set`], but reports a failed flush.
    ///
    /// The entry is kept in memory even when the error is returned.
    pub fn try_set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = epoch_now() + ttl.as_secs_f64();
        self.with_entries(|entries| {
            entries.insert(key.to_string(), StoredEntry { expires_at, value });
            self.flush(entries)
        })
    }

    /// Writes the current contents to disk.
    pub fn persist(&self) -> Result<(), CacheError> {
        self.with_entries(|entries| self.flush(entries))
    }

    fn remove_entry(&self, key: &str) -> (bool, Result<(), CacheError>) {
        self.mutate(|entries| {
            let removed = entries.remove(key).is_some();
            (removed, removed)
        })
    }

    /// Removes `key`. Returns whether an entry (live or expired) was present.
    pub fn remove(&self, key: &str) -> bool {
        let (removed, flushed) = self.remove_entry(key);
        self.warn_on_failure(flushed);
        removed
    }

    /// Like [`KvStore::remove`], but reports a failed flush.
    pub fn try_remove(&self, key: &str) -> Result<bool, CacheError> {
        let (removed, flushed) = self.remove_entry(key);
        flushed.map(|()| removed)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.warn_on_failure(self.try_clear());
    }

    /// Like [`KvStore::clear`], but reports a failed flush.
    pub fn try_clear(&self) -> Result<(), CacheError> {
        self.mutate(|entries| {
            entries.clear();
            ((), true)
        })
        .1
    }

    fn purge(&self) -> (usize, Result<(), CacheError>) {
        let now = epoch_now();
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            let purged = before - entries.len();
            (purged, purged > 0)
        })
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let (purged, flushed) = self.purge();
        self.warn_on_failure(flushed);
        purged
    }

    /// Like [`KvStore::purge_expired`], but reports a failed flush.
    pub fn try_purge_expired(&self) -> Result<usize, CacheError> {
        let (purged, flushed) = self.purge();
        flushed.map(|()| purged)
    }

    /// Snapshot of live entries, ordered by key.
    pub fn entries(&self) -> Vec<EntryInfo> {
        let now = epoch_now();
        self.with_entries(|entries| {
            entries
                .iter()
                .filter(|(_, entry)| entry.is_live(now))
                .map(|(key, entry)| EntryInfo {
                    key: key.clone(),
                    expires_at: entry.expires_at,
                    remaining: entry.remaining(now),
                })
                .collect()
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = epoch_now();
        self.with_entries(|entries| entries.values().filter(|e| e.is_live(now)).count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TtlStore for KvStore {
    fn get(&self, key: &str) -> Option<Fresh> {
        let now = epoch_now();
        self.with_entries(|entries| {
            let entry = entries.get(key)?;
            if entry.is_live(now) {
                return Some(Fresh {
                    value: entry.value.clone(),
                    remaining: entry.remaining(now),
                });
            }
            entries.remove(key);
            self.flush_best_effort(entries);
            None
        })
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.warn_on_failure(self.try_set(key, value, ttl));
    }
}

fn load(path: &Path) -> Entries {
    let mut entries = Entries::new();
    let records = match persist::read_json(path) {
        Some(Value::Object(records)) => records,
        Some(_) => {
            tracing::warn!("Ignoring {}: top level is not an object", path.display());
            return entries;
        }
        None => return entries,
    };

    let now = epoch_now();
    let mut skipped = 0usize;
    for (key, record) in records {
        match StoredEntry::from_json(&record) {
            Some(entry) if entry.is_live(now) => {
                entries.insert(key, entry);
            }
            Some(_) => {}
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("Skipped {} malformed records in {}", skipped, path.display());
    }
    tracing::debug!("Loaded {} cache entries from {}", entries.len(), path.display());
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn cache_path(dir: &TempDir) -> PathBuf {
        dir.path().join("api_cache.json")
    }

    #[test]
    fn set_and_get() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        store.set("k", json!({"rank": "Gold"}), Duration::from_secs(60));
        let fresh = store.get("k").unwrap();
        assert_eq!(fresh.value, json!({"rank": "Gold"}));
        assert!(fresh.remaining <= Duration::from_secs(60));
        assert!(fresh.remaining > Duration::from_secs(59));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        assert_eq!(store.get("anything"), None);
        assert!(store.is_empty());
        assert!(!cache_path(&dir).exists());
    }

    #[test]
    fn expired_entry_is_absent_and_removed_from_disk() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        store.set("k", json!("v"), Duration::from_millis(50));
        assert_eq!(store.get("k").map(|f| f.value), Some(json!("v")));

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(store.get("k"), None);

        let on_disk: Value = serde_json::from_slice(&fs::read(cache_path(&dir)).unwrap()).unwrap();
        assert_eq!(on_disk, json!({}));
    }

    #[test]
    fn survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let store = KvStore::new(cache_path(&dir));
            store.set("k", json!([1, 2, 3]), Duration::from_secs(60));
        }
        let reopened = KvStore::new(cache_path(&dir));
        let fresh = reopened.get("k").unwrap();
        assert_eq!(fresh.value, json!([1, 2, 3]));
        assert!(fresh.remaining > Duration::from_secs(55));
        assert!(fresh.remaining <= Duration::from_secs(60));
    }

    #[test]
    fn file_layout() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        store.set("k", json!(null), Duration::from_secs(60));

        let on_disk: Value = serde_json::from_slice(&fs::read(cache_path(&dir)).unwrap()).unwrap();
        let record = on_disk["k"].as_object().unwrap();
        assert!(record["expires_at"].as_f64().unwrap() > epoch_now());
        assert_eq!(record["value"], Value::Null);
        assert!(!persist::tmp_path(&cache_path(&dir)).exists());
    }

    #[test]
    fn corrupt_file_is_tolerated_and_preserved_until_next_write() {
        let dir = TempDir::new().unwrap();
        fs::write(cache_path(&dir), b"\x00\xffgarbage{").unwrap();

        let store = KvStore::new(cache_path(&dir));
        assert_eq!(store.get("anything"), None);
        assert_eq!(fs::read(cache_path(&dir)).unwrap(), b"\x00\xffgarbage{");

        store.set("k", json!(1), Duration::from_secs(60));
        let on_disk: Value = serde_json::from_slice(&fs::read(cache_path(&dir)).unwrap()).unwrap();
        assert_eq!(on_disk["k"]["value"], json!(1));
    }

    #[test]
    fn non_object_file_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(cache_path(&dir), b"[1, 2, 3]").unwrap();
        let store = KvStore::new(cache_path(&dir));
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dir = TempDir::new().unwrap();
        let future = epoch_now() + 600.0;
        let contents = json!({
            "good": {"expires_at": future, "value": {"wins": 10}},
            "no_value": {"expires_at": future},
            "text_expiry": {"expires_at": "soon", "value": 1},
            "no_expiry": {"value": 1},
            "not_a_record": 42,
            "stale": {"expires_at": 1.0, "value": 1},
            "integer_expiry": {"expires_at": future as i64, "value": "ok"},
        });
        fs::write(cache_path(&dir), serde_json::to_vec(&contents).unwrap()).unwrap();

        let store = KvStore::new(cache_path(&dir));
        assert_eq!(store.get("good").unwrap().value, json!({"wins": 10}));
        assert_eq!(store.get("integer_expiry").unwrap().value, json!("ok"));
        for key in ["no_value", "text_expiry", "no_expiry", "not_a_record", "stale"] {
            assert_eq!(store.get(key), None, "{key} should have been dropped");
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn loads_only_once() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        store.set("k", json!(1), Duration::from_secs(60));

        // Later edits to the file are not picked up by a hydrated store.
        fs::write(cache_path(&dir), b"{}").unwrap();
        assert_eq!(store.get("k").unwrap().value, json!(1));
    }

    #[test]
    fn overwrite_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        store.set("k", json!("old"), Duration::from_secs(60));
        store.set("k", json!("new"), Duration::from_secs(5));
        let fresh = store.get("k").unwrap();
        assert_eq!(fresh.value, json!("new"));
        assert!(fresh.remaining <= Duration::from_secs(5));
    }

    #[test]
    fn unwritable_location_is_best_effort() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = KvStore::new(blocker.join("api_cache.json"));

        store.set("k", json!("kept"), Duration::from_secs(60));
        assert_eq!(store.get("k").unwrap().value, json!("kept"));

        assert!(store.try_set("k2", json!(2), Duration::from_secs(60)).is_err());
        assert_eq!(store.get("k2").unwrap().value, json!(2));
        assert!(matches!(store.persist(), Err(CacheError::Io { .. })));
    }

    #[test]
    fn strict_maintenance_reports_write_failures() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = KvStore::new(blocker.join("api_cache.json"));
        store.set("a", json!(1), Duration::from_secs(60));
        store.set("b", json!(2), Duration::from_secs(60));
        store.set("gone", json!(3), Duration::ZERO);

        assert!(matches!(store.try_purge_expired(), Err(CacheError::Io { .. })));
        assert!(matches!(store.try_remove("a"), Err(CacheError::Io { .. })));
        assert_eq!(store.get("a"), None);
        assert!(matches!(store.try_clear(), Err(CacheError::Io { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn strict_maintenance_without_changes_does_not_write() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));

        assert!(!store.try_remove("missing").unwrap());
        assert_eq!(store.try_purge_expired().unwrap(), 0);
        assert!(!cache_path(&dir).exists());

        store.try_clear().unwrap();
        let on_disk: Value = serde_json::from_slice(&fs::read(cache_path(&dir)).unwrap()).unwrap();
        assert_eq!(on_disk, json!({}));
    }

    #[test]
    fn maintenance_operations() {
        let dir = TempDir::new().unwrap();
        let store = KvStore::new(cache_path(&dir));
        store.set("b", json!(1), Duration::from_secs(60));
        store.set("a", json!(2), Duration::from_secs(60));
        store.set("gone", json!(3), Duration::ZERO);

        assert_eq!(store.purge_expired(), 1);
        let keys: Vec<_> = store.entries().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a", "b"]);

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        let reopened = KvStore::new(cache_path(&dir));
        assert!(reopened.is_empty());
    }
}
