//! Saved locations and forecast cache for Breeze
//!
//! Provides the persisted location list, a per-location forecast cache with
//! fetch timestamps, and an Open-Meteo client that produces fresh forecasts.

pub mod types;
pub mod storage;
pub mod cache;
pub mod location_store;
pub mod geocode;
pub mod provider;
pub mod retry;

pub use types::*;
pub use cache::WeatherCache;
pub use location_store::LocationStore;
pub use provider::{ForecastSource, OpenMeteoProvider, ProviderSettings};
pub use retry::RetryConfig;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, SharedStorage, SqliteStorage};
