//! Forward geocoding: turn a saved location name into coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use reqwest::Client;
use serde::Deserialize;

use crate::retry::{with_retry, RetryConfig};
use crate::types::WeatherError;

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

/// Best match for a place name.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Place {
    /// Name with region or country for disambiguation (e.g. "Portland, Oregon").
    pub fn display_name(&self) -> String {
        let suffix = self
            .region
            .as_deref()
            .filter(|s| !s.is_empty() && *s != self.name)
            .or_else(|| {
                self.country
                    .as_deref()
                    .filter(|c| !c.is_empty() && *c != self.name)
            });

        match suffix {
            Some(s) => format!("{}, {}", self.name, s),
            None => self.name.clone(),
        }
    }
}

/// Resolve `name` to its best-ranked match.
///
/// # Errors
/// `WeatherError::NotFound` when the service knows no such place, otherwise
/// network, status or parse failures.
pub async fn geocode(
    client: &Client,
    url: &str,
    retry: &RetryConfig,
    name: &str,
) -> Result<Place, WeatherError> {
    let query = [("name", name), ("count", "1"), ("language", "en"), ("format", "json")];

    let response = with_retry(retry, || client.get(url).query(&query).send()).await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::debug!("Geocoding {} returned status {}", name, status);
        return Err(WeatherError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body: GeocodingResponse = response
        .json()
        .await
        .map_err(|e| WeatherError::Parse(format!("geocoding response: {}", e)))?;

    let first = body
        .results
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::NotFound(name.to_string()))?;

    let place = Place {
        name: first.name,
        latitude: first.latitude,
        longitude: first.longitude,
        region: first.admin1,
        country: first.country,
    };
    tracing::debug!(
        "Geocoded {} to {} ({}, {})",
        name,
        place.display_name(),
        place.latitude,
        place.longitude
    );
    Ok(place)
}
