//! Persistent forecast cache keyed by location name.
//!
//! All entries live in one JSON object under the storage key `weather_cache`.
//! Entries are never evicted; staleness is only reported, not enforced.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::storage::{read_json, write_json, SharedStorage};
use crate::types::{CachedForecast, StorageError};

/// Storage key of the forecast cache.
pub const WEATHER_CACHE_KEY: &str = "weather_cache";

type Entries = BTreeMap<String, CachedForecast>;

pub struct WeatherCache {
    storage: SharedStorage,
}

impl WeatherCache {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    fn load(&self) -> Result<Entries, StorageError> {
        Ok(read_json::<Entries>(self.storage.as_ref(), WEATHER_CACHE_KEY)?.unwrap_or_default())
    }

    /// Cached forecast for `name` (exact, case-sensitive match).
    ///
    /// # Errors
    /// `StorageError::Read` / `StorageError::Corrupt` when the cache cannot be loaded.
    pub fn try_get_cached_forecast(&self, name: &str) -> Result<Option<CachedForecast>, StorageError> {
        Ok(self.load()?.remove(name))
    }

    /// Cached forecast for `name`; an unreadable cache counts as absent.
    pub fn get_cached_forecast(&self, name: &str) -> Option<CachedForecast> {
        match self.try_get_cached_forecast(name) {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!("Failed to read cached forecast for {}: {}", name, e);
                None
            }
        }
    }

    /// Overwrite the entry for `name` and return what was stored.
    ///
    /// `fetched_at` is stamped with the current time when the caller left it
    /// unset, and never moves backwards for a given name.
    ///
    /// # Errors
    /// Write failures, and read failures other than corruption (a corrupt
    /// cache is replaced).
    pub fn set_cached_forecast(
        &self,
        name: &str,
        forecast: CachedForecast,
    ) -> Result<CachedForecast, StorageError> {
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(e @ StorageError::Corrupt { .. }) => {
                tracing::warn!("Discarding corrupt forecast cache: {}", e);
                Entries::new()
            }
            Err(e) => return Err(e),
        };

        let mut stamp = forecast
            .fetched_at
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        if let Some(previous) = entries.get(name).and_then(|f| f.fetched_at) {
            if previous > stamp {
                tracing::debug!(
                    "Keeping newer fetch time for {} ({} > {})",
                    name,
                    previous,
                    stamp
                );
                stamp = previous;
            }
        }

        let stored = CachedForecast {
            fetched_at: Some(stamp),
            ..forecast
        };
        entries.insert(name.to_string(), stored.clone());
        write_json(self.storage.as_ref(), WEATHER_CACHE_KEY, &entries)?;

        tracing::debug!("Cached forecast for {}: {} {}", name, stored.weather, stored.temperature);
        Ok(stored)
    }

    /// Names with a cached entry, sorted.
    ///
    /// # Errors
    /// `StorageError::Read` / `StorageError::Corrupt` when the cache cannot be loaded.
    pub fn cached_names(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.load()?.into_keys().collect())
    }
}
