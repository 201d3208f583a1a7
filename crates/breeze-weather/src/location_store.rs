//! Persisted list of saved locations and their favorite flags.
//!
//! Every operation is a scoped read-modify-write against the storage key
//! `locations`. The store holds no copy of the list between calls, so callers
//! must serialize operations to avoid lost updates.

use std::collections::HashSet;

use crate::storage::{read_json, write_json, SharedStorage};
use crate::types::{Location, LocationId, StorageError};

/// Storage key of the saved location list.
pub const LOCATIONS_KEY: &str = "locations";

pub struct LocationStore {
    storage: SharedStorage,
    seed: Vec<Location>,
}

impl LocationStore {
    /// Store with an empty seed list.
    pub fn new(storage: SharedStorage) -> Self {
        Self::with_seed(storage, Vec::new())
    }

    /// Store that reports `seed` until something has been persisted.
    pub fn with_seed(storage: SharedStorage, seed: Vec<Location>) -> Self {
        Self { storage, seed }
    }

    /// Build a seed list from names, assigning ids from 1. Blank names are skipped.
    pub fn seed_from_names<I, S>(names: I) -> Vec<Location>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .zip(1..)
            .map(|(name, id)| Location::new(id, name))
            .collect()
    }

    /// Persisted list, or the seed list if nothing has been saved yet.
    ///
    /// # Errors
    /// `StorageError::Read` if storage is unreadable, `StorageError::Corrupt`
    /// if the persisted list cannot be parsed or repeats an id or holds a
    /// blank name.
    pub fn try_get_saved_locations(&self) -> Result<Vec<Location>, StorageError> {
        let saved: Option<Vec<Location>> = read_json(self.storage.as_ref(), LOCATIONS_KEY)?;
        match saved {
            Some(locations) => {
                check_saved(&locations)?;
                Ok(locations)
            }
            None => Ok(self.seed.clone()),
        }
    }

    /// Persisted list, falling back to the seed list on any read failure.
    pub fn get_saved_locations(&self) -> Vec<Location> {
        match self.try_get_saved_locations() {
            Ok(locations) => locations,
            Err(e) => {
                tracing::warn!("Failed to load saved locations, using defaults: {}", e);
                self.seed.clone()
            }
        }
    }

    /// Append a location named `name.trim()` with the next free id.
    ///
    /// A blank name is a no-op: nothing is written and no id is consumed.
    ///
    /// # Errors
    /// Read failures (the mutation is never applied on top of the fallback
    /// seed) and write failures.
    pub fn add_location(&self, name: &str) -> Result<Vec<Location>, StorageError> {
        let mut locations = self.try_get_saved_locations()?;

        let name = name.trim();
        if name.is_empty() {
            tracing::debug!("Ignoring blank location name");
            return Ok(locations);
        }

        let id = next_id(&locations)
            .ok_or_else(|| StorageError::write(LOCATIONS_KEY, "no location ids left"))?;
        let location = Location::new(id, name);
        tracing::info!("Adding location {} ({})", location.name, location.id);
        locations.push(location);

        self.persist(&locations)?;
        Ok(locations)
    }

    /// Flip the favorite flag of location `id`. Unknown ids leave the list unchanged.
    ///
    /// # Errors
    /// Read and write failures.
    pub fn toggle_favorite(&self, id: LocationId) -> Result<Vec<Location>, StorageError> {
        let mut locations = self.try_get_saved_locations()?;

        let Some(location) = locations.iter_mut().find(|l| l.id == id) else {
            tracing::debug!("toggle_favorite: no location with id {}", id);
            return Ok(locations);
        };
        location.is_favorite = !location.is_favorite;
        tracing::info!(
            "Location {} favorite = {}",
            location.name,
            location.is_favorite
        );

        self.persist(&locations)?;
        Ok(locations)
    }

    /// Remove location `id`. Its cached forecast, if any, is left in place.
    ///
    /// # Errors
    /// Read and write failures.
    pub fn remove_location(&self, id: LocationId) -> Result<Vec<Location>, StorageError> {
        let mut locations = self.try_get_saved_locations()?;

        let before = locations.len();
        locations.retain(|l| l.id != id);
        if locations.len() == before {
            tracing::debug!("remove_location: no location with id {}", id);
            return Ok(locations);
        }

        tracing::info!("Removed location {}", id);
        self.persist(&locations)?;
        Ok(locations)
    }

    fn persist(&self, locations: &[Location]) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), LOCATIONS_KEY, locations)
    }
}

/// One greater than the largest id in `locations`, or 1 when empty.
/// `None` once the largest id is `LocationId::MAX`.
pub fn next_id(locations: &[Location]) -> Option<LocationId> {
    match locations.iter().map(|l| l.id).max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

fn check_saved(locations: &[Location]) -> Result<(), StorageError> {
    let mut seen = HashSet::with_capacity(locations.len());
    for location in locations {
        if !seen.insert(location.id) {
            return Err(StorageError::corrupt(
                LOCATIONS_KEY,
                format!("duplicate location id {}", location.id),
            ));
        }
        if location.name.trim().is_empty() {
            return Err(StorageError::corrupt(
                LOCATIONS_KEY,
                format!("location {} has a blank name", location.id),
            ));
        }
    }
    Ok(())
}
