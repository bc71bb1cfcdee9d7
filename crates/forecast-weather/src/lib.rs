//! Weather forecasts for free-form locations, cached by derived key.
//!
//! Forecasts come from the Visual Crossing timeline API. Successful answers are
//! cached for a fixed TTL; failures are returned as data and never cached.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod provider;
pub mod sqlite_cache;
pub mod types;

pub use cache::{CacheStore, MemoryCache};
pub use error::{CacheError, WeatherError};
pub use fetcher::{FetcherConfig, ForecastFetcher, DEFAULT_CACHE_TTL};
pub use key::{CacheKey, CACHE_KEY_PREFIX};
pub use provider::WeatherProvider;
pub use sqlite_cache::SqliteCache;
pub use types::*;
