//! Weather crate error types.
//!
//! Upstream failures are not errors here: they travel as
//! [`ForecastFailure`](crate::types::ForecastFailure) data.

use thiserror::Error;

/// Faults while building the fetcher
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Cache backend faults
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
