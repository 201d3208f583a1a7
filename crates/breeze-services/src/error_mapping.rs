//! Maps weather-crate errors to breeze_core::AppError for consistent user-facing messages.

use breeze_core::error::ReqwestErrorExt;
use breeze_core::{AppError, NetworkError};

/// Conversion into the application error taxonomy.
pub trait IntoAppError {
    fn into_app_error(self) -> AppError;
}

impl IntoAppError for breeze_weather::StorageError {
    fn into_app_error(self) -> AppError {
        use breeze_weather::StorageError as S;
        let mapped = match self {
            S::Read { key, message } => breeze_core::StorageError::ReadFailed { key, message },
            S::Write { key, message } => breeze_core::StorageError::WriteFailed { key, message },
            S::Corrupt { key, message } => breeze_core::StorageError::Corruption { key, message },
        };
        AppError::Storage(mapped)
    }
}

impl IntoAppError for breeze_weather::WeatherError {
    fn into_app_error(self) -> AppError {
        use breeze_weather::WeatherError as W;
        match self {
            W::Network(e) => AppError::Network(e.into_network_error()),
            W::NotFound(name) => AppError::Weather(breeze_core::WeatherError::LocationNotFound(name)),
            W::Api { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            W::Api { status, message } => AppError::Weather(
                breeze_core::WeatherError::ApiError(format!("{}: {}", status, message)),
            ),
            W::Parse(message) => AppError::Network(NetworkError::InvalidResponse(message)),
        }
    }
}
