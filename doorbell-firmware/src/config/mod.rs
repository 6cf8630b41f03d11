//! Settings loading
//!
//! Loads settings from flash or the embedded defaults.

pub mod loader;

pub use loader::{embedded_settings, log_settings_summary, ConfigPersistence};
