//! Runtime settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

const CACHE_FILE: &str = "api_cache.json";
const USER_IDS_FILE: &str = "user_ids.json";

/// How long each kind of upstream response stays cached.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlPolicy {
    /// Tracker network profiles.
    pub trn: Duration,
    /// RapidAPI responses. Long, because those plans carry a daily quota.
    pub rapidapi: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            trn: Duration::from_secs(120),
            rapidapi: Duration::from_secs(86_400),
        }
    }
}

/// Exponential backoff for retried provider requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based), with +/-20% jitter.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// Everything the cached client needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding the cache and saved-ID files.
    pub data_dir: PathBuf,
    pub ttl: TtlPolicy,
    /// Upper bound on a single production, retries included.
    pub producer_timeout: Duration,
    pub retry: RetryConfig,
    pub trn_api_key: Option<String>,
    /// Platform assumed when a player is given without a `platform:` prefix.
    pub trn_default_platform: String,
    pub rapidapi_key: Option<String>,
    pub rapidapi_host: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ttl: TtlPolicy::default(),
            producer_timeout: Duration::from_secs(20),
            retry: RetryConfig::default(),
            trn_api_key: None,
            trn_default_platform: "steam".to_string(),
            rapidapi_key: None,
            rapidapi_host: None,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset and
    /// unparsable numbers fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secs = |key: &str, default: Duration| {
            text(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let number = |key: &str, default: u64| {
            text(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            data_dir: text("STATBOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            ttl: TtlPolicy {
                trn: secs("STATBOT_TTL_TRN_SECS", defaults.ttl.trn),
                rapidapi: secs("STATBOT_TTL_RAPIDAPI_SECS", defaults.ttl.rapidapi),
            },
            producer_timeout: secs("STATBOT_PRODUCER_TIMEOUT_SECS", defaults.producer_timeout),
            retry: RetryConfig {
                max_retries: number("STATBOT_RETRY_MAX", defaults.retry.max_retries as u64)
                    as usize,
                base_delay_ms: number("STATBOT_RETRY_BASE_MS", defaults.retry.base_delay_ms),
                max_delay_ms: number("STATBOT_RETRY_MAX_MS", defaults.retry.max_delay_ms),
            },
            trn_api_key: text("TRN_API_KEY"),
            trn_default_platform: text("TRN_DEFAULT_PLATFORM")
                .map(|p| p.to_lowercase())
                .unwrap_or(defaults.trn_default_platform),
            rapidapi_key: text("RAPIDAPI_KEY"),
            rapidapi_host: text("RL_RAPIDAPI_HOST"),
        }
    }

    /// Path of the durable API cache.
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE)
    }

    /// Path of the saved player IDs.
    pub fn user_ids_path(&self) -> PathBuf {
        self.data_dir.join(USER_IDS_FILE)
    }
}
