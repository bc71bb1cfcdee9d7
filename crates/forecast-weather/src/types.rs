use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Models decode from any JSON object. A known field is typed only when its
// value has the expected shape; otherwise it stays in `extra` untouched.

/// Remove `key` from `map` if its value decodes as `T`.
fn take_typed<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = T::deserialize(map.get(key)?).ok()?;
    map.remove(key);
    Some(value)
}

/// One day of the multi-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct DayForecast {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempmax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    /// Remaining provider fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for DayForecast {
    fn from(mut extra: Map<String, Value>) -> Self {
        Self {
            datetime: take_typed(&mut extra, "datetime"),
            tempmax: take_typed(&mut extra, "tempmax"),
            tempmin: take_typed(&mut extra, "tempmin"),
            conditions: take_typed(&mut extra, "conditions"),
            extra,
        }
    }
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct CurrentConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windspeed: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for CurrentConditions {
    fn from(mut extra: Map<String, Value>) -> Self {
        Self {
            temp: take_typed(&mut extra, "temp"),
            humidity: take_typed(&mut extra, "humidity"),
            conditions: take_typed(&mut extra, "conditions"),
            windspeed: take_typed(&mut extra, "windspeed"),
            extra,
        }
    }
}

/// Successful forecast document as returned by the timeline API.
///
/// Any JSON object is a forecast document. `days` is filled only from a
/// non-empty array of objects; any other `days` value is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct Forecast {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<DayForecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_conditions: Option<CurrentConditions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for Forecast {
    fn from(mut extra: Map<String, Value>) -> Self {
        let days = take_days(&mut extra);
        Self {
            days,
            current_conditions: take_typed::<Map<String, Value>>(&mut extra, "currentConditions")
                .map(CurrentConditions::from),
            extra,
        }
    }
}

/// Remove and type `days` when it is a non-empty array of objects.
fn take_days(map: &mut Map<String, Value>) -> Vec<DayForecast> {
    let is_days = matches!(
        map.get("days"),
        Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_object)
    );
    if !is_days {
        return Vec::new();
    }

    match map.remove("days") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(day) => Some(DayForecast::from(day)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl Forecast {
    /// Resolved place name reported by the provider, if any
    pub fn resolved_address(&self) -> Option<&str> {
        self.extra.get("resolvedAddress").and_then(Value::as_str)
    }
}

/// Why an upstream fetch did not produce a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No HTTP answer at all (connect error, timeout, truncated body)
    Transport,
    /// Non-success HTTP status
    Http,
    /// Success status with a body that is not a forecast document
    Parse,
}

/// Failure record handed back to the caller instead of a forecast.
///
/// `status` is the upstream HTTP status, or 0 when there was none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastFailure {
    pub error: bool,
    pub kind: FailureKind,
    pub message: String,
    pub status: u16,
}

impl ForecastFailure {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Http, status, message.into())
    }

    pub fn parse(status: u16, body: &str) -> Self {
        Self::new(
            FailureKind::Parse,
            status,
            format!("Invalid JSON response: {}", body),
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, 0, message.into())
    }

    fn new(kind: FailureKind, status: u16, message: String) -> Self {
        Self {
            error: true,
            kind,
            message,
            status,
        }
    }
}

impl std::fmt::Display for ForecastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FailureKind::Transport => write!(f, "request failed: {}", self.message),
            _ => write!(f, "{} ({})", self.message, self.status),
        }
    }
}

/// Outcome of a forecast lookup. Failures are data, never panics or errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForecastResult {
    Forecast(Forecast),
    Failure(ForecastFailure),
}

impl ForecastResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            Self::Forecast(f) => Some(f),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ForecastFailure> {
        match self {
            Self::Forecast(_) => None,
            Self::Failure(f) => Some(f),
        }
    }
}

impl From<Result<Forecast, ForecastFailure>> for ForecastResult {
    fn from(result: Result<Forecast, ForecastFailure>) -> Self {
        match result {
            Ok(forecast) => Self::Forecast(forecast),
            Err(failure) => Self::Failure(failure),
        }
    }
}
