use anyhow::Result;
use std::sync::Arc;

use crate::Config;

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, validation) = Config::load_validated()?;
        if !validation.warnings.is_empty() {
            tracing::debug!("Loaded config with {} warnings", validation.warnings.len());
        }
        Ok(Self::with_config(config))
    }

    /// Create an application instance around an already-loaded config
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Prepare the data directory used by the persistence layer
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing application (data dir: {}, backend: {:?})",
            self.config.data_dir.display(),
            self.config.storage.backend
        );

        std::fs::create_dir_all(&self.config.data_dir)?;

        tracing::info!("Application initialized successfully");
        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the config for background tasks
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }
}
