//! Services behind the location screen: loading, editing and refreshing
//! saved locations and their cached forecasts.

pub mod error_mapping;
pub mod location_service;
pub mod status;

pub use error_mapping::IntoAppError;
pub use location_service::{LocationService, RefreshFailure, RefreshMessage, RefreshSummary};
pub use status::{forecast_status, NO_CACHED_DATA};
