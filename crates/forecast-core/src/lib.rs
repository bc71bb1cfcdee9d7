pub mod config;
pub mod error;

pub use config::{CacheBackend, CacheConfig, Config, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, WeatherError};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("forecast core initialized");
    Ok(())
}
