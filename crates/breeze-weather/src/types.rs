use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a saved location, stable across sessions.
pub type LocationId = i64;

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert WMO weather code to WeatherCondition
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::Sleet, // Freezing drizzle
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            66 | 67 => Self::Sleet, // Freezing rain
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Clear,
        }
    }

    /// Label stored in the cache and shown next to the temperature
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// A saved place the user tracks weather for.
///
/// `name` doubles as the forecast cache key and the weather service query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub is_favorite: bool,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_favorite: false,
        }
    }
}

/// Last known forecast for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedForecast {
    /// Short condition label, e.g. "Clear"
    pub weather: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Milliseconds since the Unix epoch; `None` until the cache stamps it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<i64>,
}

impl CachedForecast {
    /// Forecast without a fetch time; the cache stamps it on write.
    pub fn new(weather: impl Into<String>, temperature: f64) -> Self {
        Self {
            weather: weather.into(),
            temperature,
            fetched_at: None,
        }
    }

    /// Forecast stamped with the current time.
    pub fn fetched_now(weather: impl Into<String>, temperature: f64) -> Self {
        Self {
            fetched_at: Some(Utc::now().timestamp_millis()),
            ..Self::new(weather, temperature)
        }
    }

    pub fn fetched_at_utc(&self) -> Option<DateTime<Utc>> {
        self.fetched_at.and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Time elapsed since the fetch, if the entry has been stamped.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.fetched_at_utc().map(|at| now.signed_duration_since(at))
    }

    /// Display-only staleness check. Unstamped entries count as stale.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now).map_or(true, |age| age > max_age)
    }
}

/// Persistence layer errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read {key}: {message}")]
    Read { key: String, message: String },
    #[error("Failed to write {key}: {message}")]
    Write { key: String, message: String },
    #[error("Corrupt data under {key}: {message}")]
    Corrupt { key: String, message: String },
}

impl StorageError {
    pub fn read(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Read {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn write(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Write {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn corrupt(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Location not found: {0}")]
    NotFound(String),
    #[error("Weather API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wmo_code_groups() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_wmo_code(2), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_wmo_code(3), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_wmo_code(48), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_wmo_code(53), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_wmo_code(80), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_wmo_code(82), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_wmo_code(86), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_wmo_code(66), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_wmo_code(99), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_wmo_code_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_wmo_code(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_wmo_code(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_condition_description() {
        assert_eq!(WeatherCondition::Clear.description(), "Clear");
        assert_eq!(WeatherCondition::HeavyRain.description(), "Heavy Rain");
    }

    #[test]
    fn test_location_json_uses_camel_case() {
        let loc = Location {
            id: 3,
            name: "Oslo".into(),
            is_favorite: true,
        };
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["isFavorite"], serde_json::Value::Bool(true));

        let parsed: Location = serde_json::from_str(r#"{"id":7,"name":"Lima"}"#).unwrap();
        assert!(!parsed.is_favorite);
    }

    #[test]
    fn test_unstamped_forecast_is_stale() {
        let forecast = CachedForecast::new("Clear", 20.0);
        assert!(forecast.age(Utc::now()).is_none());
        assert!(forecast.is_stale(Duration::minutes(60), Utc::now()));
    }

    #[test]
    fn test_staleness_uses_fetch_time() {
        let now = Utc::now();
        let forecast = CachedForecast {
            fetched_at: Some((now - Duration::minutes(90)).timestamp_millis()),
            ..CachedForecast::new("Rain", 11.5)
        };
        assert!(forecast.is_stale(Duration::minutes(60), now));
        assert!(!forecast.is_stale(Duration::minutes(120), now));
    }
}
