//! Location screen backend: saved locations, cached forecasts and refreshes.
//!
//! Store and cache calls are synchronous and serialized through mutexes that
//! are never held across an await. Refreshes run as independent tasks; each
//! one writes only its own cache entry, so the last fetch to complete wins.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use breeze_core::AppError;
use breeze_weather::{CachedForecast, ForecastSource, Location, LocationId, LocationStore, WeatherCache};

use crate::error_mapping::IntoAppError;

/// Messages sent from background refreshes back to the caller
#[derive(Debug)]
pub enum RefreshMessage {
    /// One location finished refreshing, successfully or not
    Refreshed {
        id: LocationId,
        name: String,
        result: Result<CachedForecast, AppError>,
    },
}

/// A location whose refresh failed, with the reason
#[derive(Debug)]
pub struct RefreshFailure {
    pub id: LocationId,
    pub name: String,
    pub error: AppError,
}

/// Outcome of refreshing several locations
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub refreshed: Vec<(LocationId, CachedForecast)>,
    pub failures: Vec<RefreshFailure>,
}

impl RefreshSummary {
    pub fn succeeded(&self) -> usize {
        self.refreshed.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

pub struct LocationService<P> {
    store: Arc<Mutex<LocationStore>>,
    cache: Arc<Mutex<WeatherCache>>,
    provider: Arc<P>,
}

impl<P> Clone for LocationService<P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            provider: self.provider.clone(),
        }
    }
}

impl<P: ForecastSource + 'static> LocationService<P> {
    pub fn new(store: LocationStore, cache: WeatherCache, provider: Arc<P>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            cache: Arc::new(Mutex::new(cache)),
            provider,
        }
    }

    /// Saved locations; the seed list when storage cannot be read.
    pub fn load_locations(&self) -> Vec<Location> {
        self.store.lock().get_saved_locations()
    }

    /// Cached forecasts by location id. Locations without a readable entry are omitted.
    pub fn cached_forecasts(&self, locations: &[Location]) -> HashMap<LocationId, CachedForecast> {
        let cache = self.cache.lock();
        locations
            .iter()
            .filter_map(|loc| cache.get_cached_forecast(&loc.name).map(|f| (loc.id, f)))
            .collect()
    }

    /// # Errors
    /// Storage read or write failures.
    pub fn add_location(&self, name: &str) -> Result<Vec<Location>, AppError> {
        self.store
            .lock()
            .add_location(name)
            .map_err(IntoAppError::into_app_error)
    }

    /// # Errors
    /// Storage read or write failures.
    pub fn toggle_favorite(&self, id: LocationId) -> Result<Vec<Location>, AppError> {
        self.store
            .lock()
            .toggle_favorite(id)
            .map_err(IntoAppError::into_app_error)
    }

    /// # Errors
    /// Storage read or write failures.
    pub fn remove_location(&self, id: LocationId) -> Result<Vec<Location>, AppError> {
        self.store
            .lock()
            .remove_location(id)
            .map_err(IntoAppError::into_app_error)
    }

    /// Fetch a fresh forecast for `location` and cache it.
    ///
    /// A failed fetch leaves the previous cache entry untouched.
    ///
    /// # Errors
    /// Fetch failures (logged as warnings) and cache write failures.
    pub async fn refresh_location(&self, location: &Location) -> Result<CachedForecast, AppError> {
        refresh_one(self.provider.clone(), self.cache.clone(), location.clone()).await
    }

    /// Start an independent refresh per location and return immediately.
    ///
    /// Each task sends one `RefreshMessage::Refreshed` on `tx` when it completes.
    /// Completion order is not issuance order.
    ///
    /// # Errors
    /// `WeatherError::ServiceUnavailable` when called outside a tokio runtime.
    pub fn spawn_refresh_all(
        &self,
        locations: &[Location],
        tx: &Sender<RefreshMessage>,
    ) -> Result<usize, AppError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            tracing::error!("No async runtime for refresh: {}", e);
            AppError::Weather(breeze_core::WeatherError::ServiceUnavailable)
        })?;

        for location in locations {
            let tx = tx.clone();
            let provider = self.provider.clone();
            let cache = self.cache.clone();
            let location = location.clone();

            runtime.spawn(async move {
                let id = location.id;
                let name = location.name.clone();
                let result = refresh_one(provider, cache, location).await;
                if tx.send(RefreshMessage::Refreshed { id, name, result }).is_err() {
                    tracing::debug!("Refresh of location {} finished after the receiver closed", id);
                }
            });
        }

        tracing::info!("Started refresh of {} locations", locations.len());
        Ok(locations.len())
    }

    /// Refresh every location concurrently and wait for all of them.
    ///
    /// Every location ends up in exactly one of `refreshed` or `failures`; a
    /// task that panics counts as a failure.
    pub async fn refresh_all(&self, locations: &[Location]) -> RefreshSummary {
        let mut pending: BTreeMap<usize, Location> = locations.iter().cloned().enumerate().collect();
        let mut tasks = JoinSet::new();
        for (index, location) in &pending {
            let index = *index;
            let provider = self.provider.clone();
            let cache = self.cache.clone();
            let location = location.clone();
            tasks.spawn(async move { (index, refresh_one(provider, cache, location).await) });
        }

        let mut summary = RefreshSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!("Refresh task failed to complete: {}", e);
                    continue;
                }
            };
            let Some(location) = pending.remove(&index) else {
                continue;
            };
            match result {
                Ok(forecast) => summary.refreshed.push((location.id, forecast)),
                Err(error) => summary.failures.push(RefreshFailure {
                    id: location.id,
                    name: location.name,
                    error,
                }),
            }
        }

        // Whatever is left belongs to tasks that never returned
        for location in pending.into_values() {
            summary.failures.push(RefreshFailure {
                id: location.id,
                name: location.name,
                error: AppError::Other(anyhow::anyhow!("refresh task did not complete")),
            });
        }

        tracing::info!(
            "Refreshed {} of {} locations ({} failed)",
            summary.succeeded(),
            locations.len(),
            summary.failed()
        );
        summary
    }
}

async fn refresh_one<P: ForecastSource>(
    provider: Arc<P>,
    cache: Arc<Mutex<WeatherCache>>,
    location: Location,
) -> Result<CachedForecast, AppError> {
    let fresh = match provider.fetch_forecast_for_location(&location.name).await {
        Ok(forecast) => forecast,
        Err(e) => {
            tracing::warn!("Failed to refresh location {}: {}", location.name, e);
            return Err(e.into_app_error());
        }
    };

    let stored = cache
        .lock()
        .set_cached_forecast(&location.name, fresh)
        .map_err(|e| {
            tracing::error!("Fetched {} but could not cache it: {}", location.name, e);
            e.into_app_error()
        })?;
    Ok(stored)
}
