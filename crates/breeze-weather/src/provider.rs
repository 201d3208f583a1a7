use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::geocode::geocode;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{CachedForecast, WeatherCondition, WeatherError};

pub const OPEN_METEO_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const USER_AGENT: &str = "Breeze/0.1.0";

/// Anything that can produce a fresh forecast for a location name.
///
/// A failed fetch must not touch the cache; callers only write successful
/// results.
pub trait ForecastSource: Send + Sync {
    /// # Errors
    /// `WeatherError::NotFound` for unknown places, otherwise network or API failures.
    fn fetch_forecast_for_location(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<CachedForecast, WeatherError>> + Send;
}

/// Endpoints and request policy for [`OpenMeteoProvider`].
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            geocoding_url: OPEN_METEO_GEOCODING_URL.to_string(),
            forecast_url: OPEN_METEO_FORECAST_URL.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    weather_code: i32,
}

/// Open-Meteo client: geocode the name, then read current conditions.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    client: Arc<Client>,
    settings: ProviderSettings,
}

impl OpenMeteoProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            settings,
        })
    }

    async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, WeatherError> {
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let query = [
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current", "temperature_2m,weather_code"),
            ("temperature_unit", "celsius"),
        ];

        let response = with_retry(&self.settings.retry, || {
            self.client
                .get(&self.settings.forecast_url)
                .query(&query)
                .send()
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("forecast response: {}", e)))?;
        Ok(body.current)
    }
}

impl ForecastSource for OpenMeteoProvider {
    async fn fetch_forecast_for_location(&self, name: &str) -> Result<CachedForecast, WeatherError> {
        let place = geocode(
            &self.client,
            &self.settings.geocoding_url,
            &self.settings.retry,
            name,
        )
        .await?;

        let current = self
            .current_conditions(place.latitude, place.longitude)
            .await?;
        let condition = WeatherCondition::from_wmo_code(current.weather_code);

        tracing::info!(
            "Fetched weather for {}: {} {:.1}°C",
            place.display_name(),
            condition.description(),
            current.temperature_2m
        );

        Ok(CachedForecast::fetched_now(
            condition.description(),
            current.temperature_2m,
        ))
    }
}
