use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use breeze_core::{AppError, Config, StorageBackend};
use breeze_services::{forecast_status, LocationService};
use breeze_weather::{
    FileStorage, LocationStore, MemoryStorage, OpenMeteoProvider, ProviderSettings, RetryConfig,
    SharedStorage, SqliteStorage, WeatherCache,
};

fn open_storage(config: &Config) -> Result<SharedStorage> {
    let storage: SharedStorage = match config.storage.backend {
        StorageBackend::File => Arc::new(FileStorage::new(&config.data_dir)),
        StorageBackend::Sqlite => {
            let path = config.data_dir.join("breeze.db");
            Arc::new(
                SqliteStorage::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            )
        }
        StorageBackend::Memory => MemoryStorage::shared(),
    };
    Ok(storage)
}

fn provider_settings(config: &Config) -> ProviderSettings {
    let defaults = RetryConfig::default();
    ProviderSettings {
        geocoding_url: config.weather.geocoding_url.clone(),
        forecast_url: config.weather.forecast_url.clone(),
        timeout: Duration::from_secs(config.weather.timeout_secs),
        retry: RetryConfig {
            max_retries: config.weather.max_retries,
            ..defaults
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    breeze_core::init()?;

    let mut app = match breeze_core::App::new() {
        Ok(app) => app,
        Err(e) => {
            let err = AppError::from(e);
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    };
    app.initialize()?;
    let config = app.shared_config();

    tracing::info!("Breeze started");

    let storage = open_storage(&config)?;
    let seed = LocationStore::seed_from_names(&config.locations.seed);
    let provider = OpenMeteoProvider::new(provider_settings(&config))
        .context("Failed to build weather client")?;

    let service = LocationService::new(
        LocationStore::with_seed(storage.clone(), seed),
        WeatherCache::new(storage),
        Arc::new(provider),
    );

    let stale_after = chrono::Duration::minutes(i64::from(config.weather.stale_after_minutes));
    let locations = service.load_locations();

    let summary = service.refresh_all(&locations).await;
    for failure in &summary.failures {
        if !failure.error.is_silent() {
            eprintln!("{}: {}", failure.name, failure.error.user_message());
        }
    }

    let cached = service.cached_forecasts(&locations);
    let now = chrono::Utc::now();
    for location in &locations {
        let star = if location.is_favorite { "*" } else { " " };
        println!(
            "{} {:<20} {}",
            star,
            location.name,
            forecast_status(cached.get(&location.id), now, stale_after)
        );
    }
    println!(
        "\nRefreshed {} of {} locations",
        summary.succeeded(),
        locations.len()
    );

    app.shutdown()?;

    Ok(())
}
