//! Cached forecast lookup.
//!
//! Only successful forecasts are ever written to the cache. Every failure
//! deletes whatever the cache holds for its key, so the next request for that
//! location goes upstream again.

use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::cache::CacheStore;
use crate::error::WeatherError;
use crate::key::CacheKey;
use crate::provider::{WeatherProvider, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::types::{Forecast, ForecastResult};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Settings injected into a [`ForecastFetcher`]
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub api_key: String,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub struct ForecastFetcher<C> {
    provider: WeatherProvider,
    cache: Arc<C>,
    cache_ttl: Duration,
}

impl<C> Clone for ForecastFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            cache: Arc::clone(&self.cache),
            cache_ttl: self.cache_ttl,
        }
    }
}

impl<C> ForecastFetcher<C>
where
    C: CacheStore<Forecast>,
{
    pub fn new(config: FetcherConfig, cache: Arc<C>) -> Result<Self, WeatherError> {
        let provider =
            WeatherProvider::new(config.base_url, config.api_key, config.request_timeout)?;
        Ok(Self::with_provider(provider, cache, config.cache_ttl))
    }

    pub fn with_provider(provider: WeatherProvider, cache: Arc<C>, cache_ttl: Duration) -> Self {
        Self {
            provider,
            cache,
            cache_ttl,
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Forecast for `location`, from cache when fresh, otherwise from upstream.
    ///
    /// Never fails: upstream and parse problems come back as
    /// [`ForecastResult::Failure`].
    #[instrument(skip(self), fields(cache_key = tracing::field::Empty), level = "info")]
    pub async fn get_forecast(&self, location: Option<&str>) -> ForecastResult {
        let key = CacheKey::derive(location);
        tracing::Span::current().record("cache_key", key.as_str());
        let location = location.unwrap_or_default();

        let outcome = self
            .cache
            .fetch(key.as_str(), self.cache_ttl, || {
                self.provider.fetch_forecast(location)
            })
            .await;

        let result = ForecastResult::from(outcome);
        if let ForecastResult::Failure(failure) = &result {
            tracing::warn!(
                kind = ?failure.kind,
                status = failure.status,
                "Forecast fetch failed: {}",
                failure.message
            );
            if self.cache.delete(key.as_str()) {
                tracing::info!("Invalidated cached forecast after failed fetch");
            }
        }
        result
    }

    /// Drop the cached forecast for `location`, if any.
    pub fn invalidate(&self, location: Option<&str>) -> bool {
        self.cache.delete(CacheKey::derive(location).as_str())
    }
}
