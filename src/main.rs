use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use forecast_core::{AppError, CacheBackend, Config, WeatherError};
use forecast_weather::{
    CacheStore, FailureKind, FetcherConfig, Forecast, ForecastFailure, ForecastFetcher,
    ForecastResult, MemoryCache, SqliteCache,
};

/// Seven-day weather forecast for a location
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about)]
struct Cli {
    /// Print the raw forecast document as JSON
    #[arg(long)]
    json: bool,

    /// Free-form location, e.g. "New York, NY 10001"
    #[arg(required = true, num_args = 1..)]
    location: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    forecast_core::init()?;
    let cli = Cli::parse();

    let (config, _) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            let error = AppError::from(e);
            eprintln!("{}", error.user_message());
            return Err(error.into());
        }
    };

    let fetcher_config = FetcherConfig {
        base_url: config.weather.base_url.clone(),
        api_key: config.weather.api_key.clone(),
        cache_ttl: config.weather.cache_ttl(),
        request_timeout: config.weather.request_timeout(),
    };
    let location = cli.location.join(" ");

    let result = match config.cache.backend {
        CacheBackend::Memory => {
            let cache = Arc::new(MemoryCache::new());
            run(fetcher_config, cache, &location).await?
        }
        CacheBackend::Sqlite => {
            let path = config.cache.effective_sqlite_path(&config.config_dir);
            let cache: SqliteCache<Forecast> = SqliteCache::open(&path)
                .with_context(|| format!("Failed to open forecast cache at {}", path.display()))?;
            match cache.purge_expired() {
                Ok(0) => {}
                Ok(n) => tracing::info!("Purged {} expired forecast(s)", n),
                Err(e) => tracing::warn!("Failed to purge expired forecasts: {}", e),
            }
            run(fetcher_config, Arc::new(cache), &location).await?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    match result {
        ForecastResult::Forecast(forecast) => {
            if !cli.json {
                print_forecast(&location, &forecast);
            }
            Ok(ExitCode::SUCCESS)
        }
        ForecastResult::Failure(failure) => {
            let error = AppError::Weather(weather_error(&failure));
            eprintln!("{}", error.user_message());
            eprintln!("  {}", failure);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run<C>(config: FetcherConfig, cache: Arc<C>, location: &str) -> Result<ForecastResult>
where
    C: CacheStore<Forecast>,
{
    let fetcher = ForecastFetcher::new(config, cache)?;
    Ok(fetcher.get_forecast(Some(location)).await)
}

fn weather_error(failure: &ForecastFailure) -> WeatherError {
    match failure.kind {
        FailureKind::Parse => WeatherError::InvalidResponse(failure.message.clone()),
        FailureKind::Transport | FailureKind::Http => {
            WeatherError::from_status(failure.status, failure.message.clone())
        }
    }
}

fn print_forecast(location: &str, forecast: &Forecast) {
    println!("{}", forecast.resolved_address().unwrap_or(location));

    if let Some(current) = &forecast.current_conditions {
        println!(
            "  Now: {}  {}  humidity {}  wind {}",
            fmt_temp(current.temp),
            current.conditions.as_deref().unwrap_or("-"),
            current.humidity.map_or_else(|| "-".to_string(), |h| format!("{:.0}%", h)),
            current.windspeed.map_or_else(|| "-".to_string(), |w| format!("{:.1} mph", w)),
        );
    }

    println!();
    for day in &forecast.days {
        let date = day
            .datetime
            .map_or_else(|| "----------".to_string(), |d| d.format("%a %b %d").to_string());
        println!(
            "  {:<10}  {:>6} / {:<6}  {}",
            date,
            fmt_temp(day.tempmax),
            fmt_temp(day.tempmin),
            day.conditions.as_deref().unwrap_or("-"),
        );
    }
}

fn fmt_temp(temp: Option<f64>) -> String {
    temp.map_or_else(|| "-".to_string(), |t| format!("{:.0}°F", t))
}
