//! Integration tests for LocationService.
//!
//! Most tests use an in-process forecast source; the last one drives the real
//! Open-Meteo client against a wiremock server.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use breeze_core::{AppError, StorageError as CoreStorageError, WeatherError as CoreWeatherError};
use breeze_services::{LocationService, RefreshMessage};
use breeze_weather::{
    CachedForecast, ForecastSource, KeyValueStorage, Location, LocationStore, MemoryStorage,
    OpenMeteoProvider, ProviderSettings, RetryConfig, SharedStorage, StorageError, WeatherCache,
    WeatherError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Forecast source answering from a fixed table; unknown names are not found.
#[derive(Default)]
struct StubForecasts {
    table: HashMap<String, (String, f64)>,
}

impl StubForecasts {
    fn with(entries: &[(&str, &str, f64)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(name, weather, temp)| (name.to_string(), (weather.to_string(), *temp)))
                .collect(),
        }
    }
}

impl ForecastSource for StubForecasts {
    async fn fetch_forecast_for_location(&self, name: &str) -> Result<CachedForecast, WeatherError> {
        tokio::task::yield_now().await;
        match self.table.get(name) {
            Some((weather, temp)) => Ok(CachedForecast::fetched_now(weather.clone(), *temp)),
            None => Err(WeatherError::NotFound(name.to_string())),
        }
    }
}

/// Forecast source whose task dies on one particular name.
struct CrashingForecasts {
    inner: StubForecasts,
    crash_on: &'static str,
}

impl ForecastSource for CrashingForecasts {
    async fn fetch_forecast_for_location(&self, name: &str) -> Result<CachedForecast, WeatherError> {
        if name == self.crash_on {
            panic!("forecast source crashed on {name}");
        }
        self.inner.fetch_forecast_for_location(name).await
    }
}

/// Storage whose reads always fail.
struct UnreadableStorage;

impl KeyValueStorage for UnreadableStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::read(key, "I/O error"))
    }

    fn write(&self, _key: &str, _value: &[u8]) -> Result<(), StorageError> {
        Ok(())
    }
}

fn service_with<P: ForecastSource + 'static>(
    storage: SharedStorage,
    provider: P,
) -> LocationService<P> {
    LocationService::new(
        LocationStore::new(storage.clone()),
        WeatherCache::new(storage),
        Arc::new(provider),
    )
}

#[test]
fn test_unreadable_storage_shows_seed_list() {
    let seed = LocationStore::seed_from_names(["New York", "London"]);
    let storage: SharedStorage = Arc::new(UnreadableStorage);
    let service = LocationService::new(
        LocationStore::with_seed(storage.clone(), seed.clone()),
        WeatherCache::new(storage),
        Arc::new(StubForecasts::default()),
    );

    let locations = service.load_locations();
    assert_eq!(locations, seed);
    assert!(service.cached_forecasts(&locations).is_empty());
}

#[test]
fn test_edits_go_through_the_store() {
    let service = service_with(MemoryStorage::shared(), StubForecasts::default());

    service.add_location("Tokyo").unwrap();
    service.add_location("   ").unwrap();
    service.add_location("Oslo").unwrap();
    service.toggle_favorite(2).unwrap();
    let list = service.remove_location(1).unwrap();

    assert_eq!(
        list,
        vec![Location {
            id: 2,
            name: "Oslo".into(),
            is_favorite: true
        }]
    );
    assert_eq!(service.load_locations(), list);
}

#[test]
fn test_edit_on_unreadable_storage_is_storage_error() {
    let service = service_with(Arc::new(UnreadableStorage), StubForecasts::default());

    let err = service.add_location("Tokyo").unwrap_err();
    assert!(matches!(err, AppError::Storage(CoreStorageError::ReadFailed { .. })));
}

#[tokio::test]
async fn test_refresh_location_caches_result() {
    let service = service_with(
        MemoryStorage::shared(),
        StubForecasts::with(&[("Paris", "Clear", 20.0)]),
    );
    let locations = service.add_location("Paris").unwrap();

    let fresh = service.refresh_location(&locations[0]).await.unwrap();
    assert_eq!(fresh.weather, "Clear");

    let cached = service.cached_forecasts(&locations);
    assert_eq!(cached.get(&1), Some(&fresh));
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_forecast() {
    let storage = MemoryStorage::shared();
    let previous = WeatherCache::new(storage.clone())
        .set_cached_forecast("Atlantis", CachedForecast::new("Fog", 9.0))
        .unwrap();
    let service = service_with(storage, StubForecasts::default());
    let locations = service.add_location("Atlantis").unwrap();

    let err = service.refresh_location(&locations[0]).await.unwrap_err();
    assert!(matches!(err, AppError::Weather(CoreWeatherError::LocationNotFound(_))));
    assert!(err.is_silent());

    let cached = service.cached_forecasts(&locations);
    assert_eq!(cached.get(&1), Some(&previous));
}

#[tokio::test]
async fn test_refresh_all_reports_counts() {
    let service = service_with(
        MemoryStorage::shared(),
        StubForecasts::with(&[("Tokyo", "Rain", 17.0), ("Oslo", "Snow", -3.0)]),
    );
    service.add_location("Tokyo").unwrap();
    service.add_location("Atlantis").unwrap();
    let locations = service.add_location("Oslo").unwrap();

    let summary = service.refresh_all(&locations).await;
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].name, "Atlantis");

    let cached = service.cached_forecasts(&locations);
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[&1].weather, "Rain");
    assert_eq!(cached[&3].weather, "Snow");
}

#[tokio::test]
async fn test_refresh_all_counts_crashed_task_as_failure() {
    let provider = CrashingForecasts {
        inner: StubForecasts::with(&[("Tokyo", "Rain", 17.0), ("Oslo", "Snow", -3.0)]),
        crash_on: "Lima",
    };
    let service = service_with(MemoryStorage::shared(), provider);
    service.add_location("Tokyo").unwrap();
    service.add_location("Lima").unwrap();
    let locations = service.add_location("Oslo").unwrap();

    let summary = service.refresh_all(&locations).await;
    assert_eq!(summary.succeeded() + summary.failed(), locations.len());
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].id, 2);
    assert!(matches!(summary.failures[0].error, AppError::Other(_)));
}

#[tokio::test]
async fn test_spawn_refresh_all_sends_one_message_per_location() {
    let provider = StubForecasts::with(&[("Tokyo", "Clear", 25.0), ("Lima", "Cloudy", 18.0)]);
    let service = service_with(MemoryStorage::shared(), provider);
    service.add_location("Tokyo").unwrap();
    service.add_location("Lima").unwrap();
    let locations = service.add_location("Atlantis").unwrap();

    let (tx, rx) = mpsc::channel();
    let started = service.spawn_refresh_all(&locations, &tx).unwrap();
    assert_eq!(started, 3);
    drop(tx);

    let messages = tokio::task::spawn_blocking(move || {
        (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect::<Vec<_>>()
    })
    .await
    .unwrap();

    let mut ok = Vec::new();
    let mut failed = Vec::new();
    for message in messages {
        let RefreshMessage::Refreshed { id, name, result } = message;
        match result {
            Ok(_) => ok.push(id),
            Err(_) => failed.push(name),
        }
    }
    ok.sort();
    assert_eq!(ok, vec![1, 2]);
    assert_eq!(failed, vec!["Atlantis".to_string()]);
}

#[tokio::test]
async fn test_spawn_refresh_all_still_caches_after_receiver_closes() {
    let service = service_with(
        MemoryStorage::shared(),
        StubForecasts::with(&[("Tokyo", "Clear", 25.0)]),
    );
    let locations = service.add_location("Tokyo").unwrap();

    let (tx, rx) = mpsc::channel();
    drop(rx);
    service.spawn_refresh_all(&locations, &tx).unwrap();

    let mut cached = service.cached_forecasts(&locations);
    for _ in 0..100 {
        if !cached.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        cached = service.cached_forecasts(&locations);
    }
    assert_eq!(cached[&1].weather, "Clear");
}

#[test]
fn test_spawn_refresh_all_outside_runtime_fails() {
    let service = service_with(MemoryStorage::shared(), StubForecasts::default());
    let (tx, _rx) = mpsc::channel();

    let err = service
        .spawn_refresh_all(&[Location::new(1, "Tokyo")], &tx)
        .unwrap_err();
    assert!(matches!(err, AppError::Weather(CoreWeatherError::ServiceUnavailable)));
}

#[tokio::test]
async fn test_refresh_through_open_meteo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"name": "Reykjavik", "latitude": 64.15, "longitude": -21.94}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature_2m": 2.5, "weather_code": 73}
        })))
        .mount(&server)
        .await;

    let provider = OpenMeteoProvider::new(ProviderSettings {
        geocoding_url: format!("{}/v1/search", server.uri()),
        forecast_url: format!("{}/v1/forecast", server.uri()),
        timeout: Duration::from_secs(5),
        retry: RetryConfig::new(0, 1, 1),
    })
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let storage: SharedStorage = Arc::new(breeze_weather::FileStorage::new(dir.path()));
    let service = service_with(storage.clone(), provider);
    let locations = service.add_location("Reykjavik").unwrap();

    let summary = service.refresh_all(&locations).await;
    assert_eq!(summary.succeeded(), 1);

    // A fresh cache over the same directory sees the result
    let cached = WeatherCache::new(storage).get_cached_forecast("Reykjavik").unwrap();
    assert_eq!(cached.weather, "Snow");
    assert_eq!(cached.temperature, 2.5);
}
