//! Centralized error types for the forecast application.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling at the application boundary
//! - Provides user-friendly messages suitable for terminal output
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message fit for the person at the terminal.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("{0:#}")]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    /// Recover a typed [`ConfigError`] from a config-loading error chain.
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ConfigError>() {
            Ok(config) => AppError::Config(config),
            Err(other) => AppError::Other(other),
        }
    }
}

impl AppError {
    /// Returns a user-friendly message.
    ///
    /// These messages are designed to be actionable and non-technical.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Weather service errors, as seen by the person asking for a forecast.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Weather API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,
}

impl WeatherError {
    /// Classify an upstream status code and message.
    ///
    /// Status 0 means the request never got an HTTP answer.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            0 => WeatherError::ServiceUnavailable(message),
            400 | 404 => WeatherError::LocationNotFound(message),
            401 | 403 => WeatherError::InvalidApiKey,
            429 => WeatherError::RateLimited,
            s if s >= 500 => WeatherError::ServiceUnavailable(message),
            s => WeatherError::ApiError { status: s, message },
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::LocationNotFound(_) => "Location not found. Check and try again.",
            WeatherError::ApiError { .. } => "Weather service error. Please try again.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherError::ServiceUnavailable(_) => {
                "Weather service unavailable. Please try again later."
            }
            WeatherError::InvalidResponse(_) => {
                "Received an unexpected response from the weather service."
            }
            WeatherError::RateLimited => "Too many weather requests. Please wait and try again.",
        }
    }
}
