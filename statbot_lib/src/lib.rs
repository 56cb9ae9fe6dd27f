//! Library layer for statbot: the durable single-flight request cache and
//! the cached provider client built on it.
//!
//! Command handlers share one [`SingleFlightCache`] per process. Each lookup
//! supplies a producer (usually an HTTP request through [`statbot_api`]) that
//! runs only on a miss, and at most once per key at a time.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod memory;
mod persist;
pub mod store;
pub mod user_ids;

pub use statbot_api;

pub use cache::{Cached, SingleFlightCache};
pub use client::CachedClient;
pub use config::{RetryConfig, Settings, TtlPolicy};
pub use error::{CacheError, ProduceError, StatBotError};
pub use keys::CacheKey;
pub use memory::MemoryStore;
pub use store::{EntryInfo, Fresh, KvStore, TtlStore};
pub use user_ids::{ClearTarget, IdSet, Platform, UserIdStore};
