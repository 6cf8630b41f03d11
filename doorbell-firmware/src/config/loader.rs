//! Settings persistence
//!
//! Loads settings from the asset store. Falls back to the embedded
//! defaults if nothing is stored.

use core::str;
use defmt::*;

use doorbell_core::config::{ConfigError, Settings};
use doorbell_core::traits::{Storage, StorageError};

/// Store path of the settings override
pub const SETTINGS_PATH: &str = "/config/doorbell.toml";

/// Settings persistence errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Store read failed
    Storage(StorageError),
    /// Invalid UTF-8 in the stored document
    InvalidUtf8,
    /// Document failed to parse or validate
    Config(ConfigError),
}

impl From<StorageError> for LoadError {
    fn from(e: StorageError) -> Self {
        LoadError::Storage(e)
    }
}

/// Settings persistence manager
pub struct ConfigPersistence<S> {
    storage: S,
}

impl<S: Storage> ConfigPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Reclaim the store once settings are loaded
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Load the stored settings document
    pub async fn load(&mut self) -> Result<Settings, LoadError> {
        info!("Loading settings from flash...");

        let bytes = self.storage.read(SETTINGS_PATH).await?;
        debug!("Read {} bytes of TOML from flash", bytes.len());

        let text = str::from_utf8(&bytes).map_err(|_| LoadError::InvalidUtf8)?;
        let settings = Settings::from_toml(text).map_err(LoadError::Config)?;

        log_settings_summary(&settings);
        Ok(settings)
    }
}

/// Parse the embedded document, falling back to built-in defaults
pub fn embedded_settings(text: &str) -> Settings {
    match Settings::from_toml(text) {
        Ok(settings) => {
            info!("Parsed embedded settings successfully");
            settings
        }
        Err(e) => {
            // build.rs validates the embedded file, so only a range check can fail here
            error!("Failed to parse embedded settings: {:?}", e);
            error!("Using built-in defaults");
            Settings::default()
        }
    }
}

/// Log a summary of the loaded settings
pub fn log_settings_summary(settings: &Settings) {
    info!("Settings loaded successfully");
    debug!("  hostname {=str}", settings.hostname.as_str());
    debug!("  image url {=str}", settings.image_url.as_str());
    debug!("  {} LEDs, idle {}..{}", settings.leds, settings.led_idle_start, settings.led_idle_end);
    debug!(
        "  panel {}x{}, inverted {}",
        settings.panel_width, settings.panel_height, settings.invert
    );
    debug!("  hold {}s, refetch {}s, retry {}s", settings.hold_time, settings.refetch, settings.retry);
}
