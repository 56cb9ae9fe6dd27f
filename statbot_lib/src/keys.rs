//! Namespaced cache keys.

use std::fmt;

/// A lowercased, `:`-separated cache key such as `trn:smite2:steam:player`.
///
/// Keys must be unique per logical query, so every parameter that changes
/// the upstream response belongs in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a key with its provider namespace.
    pub fn new(namespace: &str) -> Self {
        Self(namespace.trim().to_lowercase())
    }

    /// Appends one segment.
    pub fn segment(mut self, part: impl AsRef<str>) -> Self {
        self.0.push(':');
        self.0.push_str(&part.as_ref().trim().to_lowercase());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
