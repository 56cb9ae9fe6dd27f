//! Caching and retrying wrapper around the provider client.

use std::future::Future;
use std::sync::Arc;

use statbot_api::identity::{looks_like_trn_app_id, split_platform_identifier};
use statbot_api::Client;

use crate::cache::{Cached, SingleFlightCache};
use crate::config::Settings;
use crate::error::StatBotError;
use crate::keys::CacheKey;
use crate::store::KvStore;

/// Provider client that answers from the shared durable cache when it can.
///
/// Every upstream call runs as the producer of a single-flight lookup, so
/// concurrent commands asking for the same player share one request. Retry
/// with backoff happens inside the producer and the whole production is
/// bounded by [`Settings::producer_timeout`].
pub struct CachedClient {
    inner: Client,
    cache: Arc<SingleFlightCache<KvStore>>,
    settings: Settings,
}

impl CachedClient {
    /// Creates a cached client using the production provider URLs.
    pub fn new(cache: Arc<SingleFlightCache<KvStore>>, settings: Settings) -> Self {
        Self {
            inner: Client::new(),
            cache,
            settings,
        }
    }

    /// Creates a cached client with a custom tracker network base URL. Used for testing.
    pub fn with_base_url(
        base_url: &str,
        cache: Arc<SingleFlightCache<KvStore>>,
        settings: Settings,
    ) -> Self {
        Self {
            inner: Client::with_base_url(base_url),
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &SingleFlightCache<KvStore> {
        &self.cache
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn with_retry<T, F, Fut>(&self, label: &str, mut f: F) -> Result<T, StatBotError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StatBotError>>,
    {
        let cfg = &self.settings.retry;
        let mut attempt = 0usize;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt > cfg.max_retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = cfg.delay_for_attempt(attempt);
                    tracing::warn!(
                        "{} request failed (attempt {}/{}), retrying in {:.1}s",
                        label,
                        attempt,
                        cfg.max_retries,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Fetches a tracker network profile for `player` in `game`.
    ///
    /// `player` may carry a `platform:` prefix; otherwise the configured
    /// default platform is used.
    pub async fn trn_profile(&self, game: &str, player: &str) -> Result<Cached, StatBotError> {
        let api_key = self
            .settings
            .trn_api_key
            .as_deref()
            .ok_or(StatBotError::MissingCredential("TRN_API_KEY"))?;
        if !looks_like_trn_app_id(api_key) {
            tracing::warn!("TRN_API_KEY does not look like a TRN app ID (expected a UUID)");
        }

        let game = game.trim().to_lowercase();
        if game.is_empty() {
            return Err(StatBotError::InvalidInput("a game slug is required".to_string()));
        }
        let (platform, identifier) =
            split_platform_identifier(player, &self.settings.trn_default_platform)
                .ok_or_else(|| StatBotError::InvalidInput("a player name is required".to_string()))?;

        let key = CacheKey::new("trn")
            .segment(&game)
            .segment(&platform)
            .segment(&identifier);
        let cached = self
            .cache
            .get_or_produce_within(
                key.as_str(),
                self.settings.ttl.trn,
                self.settings.producer_timeout,
                || {
                    self.with_retry("trn", || async {
                        Ok(self
                            .inner
                            .trn_profile(api_key, &game, &platform, &identifier)
                            .await?)
                    })
                },
            )
            .await?;
        Ok(cached)
    }

    /// Fetches a JSON object from the configured RapidAPI host.
    pub async fn rapidapi(&self, url: &str) -> Result<Cached, StatBotError> {
        let api_key = self
            .settings
            .rapidapi_key
            .as_deref()
            .ok_or(StatBotError::MissingCredential("RAPIDAPI_KEY"))?;
        let api_host = self
            .settings
            .rapidapi_host
            .as_deref()
            .ok_or(StatBotError::MissingCredential("RL_RAPIDAPI_HOST"))?;
        let url = url.trim();
        if url.is_empty() {
            return Err(StatBotError::InvalidInput("a URL is required".to_string()));
        }

        let key = CacheKey::new("rapidapi").segment(api_host).segment(url);
        let cached = self
            .cache
            .get_or_produce_within(
                key.as_str(),
                self.settings.ttl.rapidapi,
                self.settings.producer_timeout,
                || {
                    self.with_retry("rapidapi", || async {
                        Ok(self.inner.rapidapi_json(url, api_key, api_host).await?)
                    })
                },
            )
            .await?;
        Ok(cached)
    }
}

fn is_retryable(err: &StatBotError) -> bool {
    match err {
        StatBotError::Api(api_err) => match api_err {
            statbot_api::Error::RequestFailed => true,
            statbot_api::Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        },
        _ => false,
    }
}
