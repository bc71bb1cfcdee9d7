//! Integration tests for ForecastFetcher caching policy using wiremock.
//!
//! Upstream call counts are asserted with `Mock::expect`, verified when the
//! mock server drops.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use forecast_weather::{
    CacheStore, FailureKind, FetcherConfig, Forecast, ForecastFetcher, ForecastResult,
    MemoryCache, SqliteCache, DEFAULT_CACHE_TTL,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: &str, cache_ttl: Duration) -> FetcherConfig {
    FetcherConfig {
        base_url: base_url.to_string(),
        api_key: "test_key".to_string(),
        cache_ttl,
        request_timeout: Duration::from_secs(2),
    }
}

fn memory_fetcher(base_url: &str, cache_ttl: Duration) -> ForecastFetcher<MemoryCache<Forecast>> {
    ForecastFetcher::new(config(base_url, cache_ttl), Arc::new(MemoryCache::new())).unwrap()
}

/// Helper to create a forecast document
fn forecast_body(tempmax: f64) -> serde_json::Value {
    serde_json::json!({
        "resolvedAddress": "New York, NY, United States",
        "days": [
            {"datetime": "2024-03-01", "tempmax": tempmax, "tempmin": tempmax - 15.0, "conditions": "Partially cloudy"},
            {"datetime": "2024-03-02", "tempmax": tempmax - 3.0, "tempmin": tempmax - 18.0, "conditions": "Rain"},
            {"datetime": "2024-03-03", "tempmax": tempmax + 2.0, "tempmin": tempmax - 11.0, "conditions": "Clear"}
        ],
        "currentConditions": {"temp": tempmax - 5.0, "humidity": 62.3, "conditions": "Overcast", "windspeed": 11.4}
    })
}

#[tokio::test]
async fn test_successful_forecast_has_days_and_current_conditions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/New%20York%2C%20NY/next7days"))
        .and(query_param("key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(55.0)))
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);
    let result = fetcher.get_forecast(Some("New York, NY")).await;

    let forecast = result.forecast().unwrap();
    assert!(forecast.days.len() > 1);
    assert!(forecast.days.iter().all(|d| d.tempmin.is_some() && d.tempmax.is_some()));
    assert!(forecast.days[0].conditions.is_some());
    let current = forecast.current_conditions.as_ref().unwrap();
    assert!(current.temp.is_some());
    assert!(current.humidity.is_some());
    assert!(current.windspeed.is_some());
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(72.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);
    let first = fetcher.get_forecast(Some("New York, NY")).await;
    let second = fetcher.get_forecast(Some("New York, NY")).await;

    assert!(!first.is_error());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_different_locations_use_different_entries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/San%20Francisco%2C%20CA/next7days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(72.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/New%20York%2C%20NY/next7days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(65.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);
    let sf = fetcher.get_forecast(Some("San Francisco, CA")).await;
    let ny = fetcher.get_forecast(Some("New York, NY")).await;

    assert_ne!(sf, ny);
    assert_eq!(fetcher.cache().len(), 2);
    assert!(fetcher.cache().get("weather_forecast_san_francisco_ca").is_some());
    assert!(fetcher.cache().get("weather_forecast_new_york_ny").is_some());
}

#[tokio::test]
async fn test_locations_sharing_a_zip_share_an_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(70.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);
    let first = fetcher.get_forecast(Some("New York, NY 10001")).await;
    let second = fetcher.get_forecast(Some("10001 New York, NY")).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_http_failure_is_not_cached_and_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("Bad API Request:Invalid location parameter value."),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);

    for _ in 0..2 {
        let result = fetcher.get_forecast(Some("invalid-location-to-force-error")).await;
        let failure = result.failure().unwrap();
        assert!(failure.error);
        assert_eq!(failure.status, 400);
        assert_eq!(failure.kind, FailureKind::Http);
        assert!(fetcher.cache().is_empty());
    }
}

#[tokio::test]
async fn test_recovers_after_upstream_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(48.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);

    let failed = fetcher.get_forecast(Some("Chicago, IL")).await;
    assert_eq!(failed.failure().map(|f| f.status), Some(500));

    let recovered = fetcher.get_forecast(Some("Chicago, IL")).await;
    assert!(!recovered.is_error());

    // Now cached: no third upstream call
    let cached = fetcher.get_forecast(Some("Chicago, IL")).await;
    assert_eq!(recovered, cached);
}

#[tokio::test]
async fn test_invalid_json_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Service maintenance</html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);

    for _ in 0..2 {
        let result = fetcher.get_forecast(Some("Seattle, WA")).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Parse);
        assert_eq!(failure.status, 200);
        assert_eq!(
            failure.message,
            "Invalid JSON response: <html>Service maintenance</html>"
        );
    }
    assert!(fetcher.cache().is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_data() {
    let fetcher = memory_fetcher("http://127.0.0.1:1", DEFAULT_CACHE_TTL);
    let result = fetcher.get_forecast(Some("Miami, FL")).await;

    match result {
        ForecastResult::Failure(failure) => {
            assert_eq!(failure.kind, FailureKind::Transport);
            assert_eq!(failure.status, 0);
        }
        ForecastResult::Forecast(_) => panic!("expected a failure"),
    }
    assert!(fetcher.cache().is_empty());
}

#[tokio::test]
async fn test_expired_entry_triggers_fresh_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(72.0)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), Duration::from_millis(100));

    fetcher.get_forecast(Some("New York, NY")).await;
    fetcher.get_forecast(Some("New York, NY")).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    fetcher.get_forecast(Some("New York, NY")).await;
}

#[tokio::test]
async fn test_concurrent_misses_both_go_upstream_and_agree() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(80.0))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1..=2)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);
    let a = fetcher.clone();
    let b = fetcher.clone();

    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.get_forecast(Some("Phoenix, AZ")).await }),
        tokio::spawn(async move { b.get_forecast(Some("Phoenix, AZ")).await }),
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(fetcher.cache().len(), 1);
}

#[tokio::test]
async fn test_sqlite_backend_serves_cached_forecast_after_reopen() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(33.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("forecast_cache.db");

    let first = {
        let cache = Arc::new(SqliteCache::open(&db_path).unwrap());
        let fetcher = ForecastFetcher::new(config(&mock_server.uri(), DEFAULT_CACHE_TTL), cache).unwrap();
        fetcher.get_forecast(Some("Anchorage, AK 99501")).await
    };

    let cache = Arc::new(SqliteCache::open(&db_path).unwrap());
    let fetcher = ForecastFetcher::new(config(&mock_server.uri(), DEFAULT_CACHE_TTL), cache).unwrap();
    let second = fetcher.get_forecast(Some("Anchorage, AK 99501")).await;

    assert!(!first.is_error());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_oddly_shaped_forecast_is_cached_as_is() {
    let mock_server = MockServer::start().await;
    let body = serde_json::json!({
        "resolvedAddress": "Nome, AK, United States",
        "days": [{"datetime": "Mar 1", "tempmax": "n/a", "tempmin": -4.0}],
        "currentConditions": null
    });

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = memory_fetcher(&mock_server.uri(), DEFAULT_CACHE_TTL);
    let first = fetcher.get_forecast(Some("Nome, AK 99762")).await;
    let second = fetcher.get_forecast(Some("Nome, AK 99762")).await;

    let forecast = first.forecast().unwrap();
    assert_eq!(forecast.days[0].tempmin, Some(-4.0));
    assert_eq!(forecast.days[0].tempmax, None);
    assert_eq!(serde_json::to_value(forecast).unwrap(), body);
    assert_eq!(first, second);
}
