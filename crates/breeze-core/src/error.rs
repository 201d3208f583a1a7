//! Error taxonomy shared by every Breeze crate.
//!
//! Domain crates keep their own error enums; the services layer folds them
//! into [`AppError`], which carries both the detailed `Display` text for logs
//! and a short `user_message()` for the location screen.

use thiserror::Error;

/// Top-level error returned by the services layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("weather: {0}")]
    Weather(#[from] WeatherError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(anyhow::Error),
}

/// Startup plumbing returns `anyhow`; typed config errors inside it are kept.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(config) => AppError::Config(config),
            Err(err) => AppError::Other(err),
        }
    }
}

impl AppError {
    /// Short message for the location screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Io(_) => "Could not access the data folder.",
            AppError::Other(_) => "Something went wrong.",
        }
    }

    /// Whether the error should only be logged rather than shown to the user.
    ///
    /// Fetch failures keep the last good forecast on screen, so they never
    /// interrupt the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Weather(_))
    }
}

/// Transport failures talking to the weather service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not connect: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "You appear to be offline.",
            NetworkError::Timeout => "The weather service took too long to answer.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is having trouble right now."
            }
            NetworkError::ServerError { .. } => "The weather service rejected the request.",
            NetworkError::InvalidResponse(_) => "The weather service sent something unexpected.",
        }
    }
}

/// Local persistence errors (saved locations, forecast cache).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {key}: {message}")]
    ReadFailed { key: String, message: String },

    #[error("Failed to write {key}: {message}")]
    WriteFailed { key: String, message: String },

    #[error("Stored data is corrupt ({key}): {message}")]
    Corruption { key: String, message: String },
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ReadFailed { .. } => "Saved data could not be loaded. Showing defaults.",
            StorageError::WriteFailed { .. } => "Your change could not be saved.",
            StorageError::Corruption { .. } => "Saved data is damaged and was ignored.",
        }
    }
}

/// Problems with `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bad setting: {0}")]
    Invalid(String),

    #[error("could not parse config: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "A setting in config.toml is invalid. Fix it and restart.",
            ConfigError::ParseError(_) => "config.toml could not be read. Fix it and restart.",
        }
    }
}

/// Weather lookups that reached the service but did not produce a forecast.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("unknown location: {0}")]
    LocationNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("weather service unavailable")]
    ServiceUnavailable,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::LocationNotFound(_) => "No weather found for that place name.",
            WeatherError::ApiError(_) => "The weather service returned an error.",
            WeatherError::ServiceUnavailable => "Weather updates are unavailable right now.",
        }
    }
}

/// Classify a reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::Timeout;
        }
        if self.is_decode() {
            return NetworkError::InvalidResponse(self.to_string());
        }
        match self.status() {
            Some(status) => NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            },
            None => NetworkError::ConnectionFailed(self.to_string()),
        }
    }
}
