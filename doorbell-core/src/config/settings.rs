//! Doorbell settings

use alloc::string::{String, ToString};
use serde::Deserialize;

/// Seconds per idle redraw bucket
pub const IDLE_PERIOD_S: i64 = 60;

/// Hold time of the connection status banner
pub const STATUS_HOLD_S: u32 = 10;

/// Firmware version shown on the status banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Document is not valid TOML or a value has the wrong type
    Parse(String),
    /// A value is out of range
    Invalid(&'static str),
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::Parse(msg) => defmt::write!(f, "Parse({=str})", msg.as_str()),
            ConfigError::Invalid(field) => defmt::write!(f, "Invalid({=str})", field),
        }
    }
}

/// All doorbell tunables
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Device name shown on the status banner
    pub hostname: String,
    /// Application name shown on the status banner
    pub app_name: String,

    /// Base URL for artwork, empty to disable remote fetches
    pub image_url: String,
    /// Artwork file extension
    pub image_ext: String,
    /// Mount path of the local asset store
    pub mount: String,

    /// Default idle artwork
    pub image_idle: String,
    /// Artwork while someone is expected to answer
    pub image_wait: String,
    /// Artwork while busy
    pub image_busy: String,
    /// Artwork while away
    pub image_away: String,
    /// Full moon idle artwork
    pub image_moon: String,
    /// Christmas idle artwork
    pub image_xmas: String,
    /// Easter idle artwork
    pub image_east: String,
    /// New Year idle artwork
    pub image_year: String,
    /// Halloween idle artwork
    pub image_hall: String,

    /// Seconds a press or override stays on screen
    pub hold_time: u32,
    /// Seconds between forced full panel refreshes, 0 disables
    pub refresh: u32,
    /// Seconds a fetched asset is trusted before revalidating
    pub refetch: u32,
    /// Seconds to wait after a failed fetch
    pub retry: u32,
    /// Local time offset from UTC
    pub utc_offset_minutes: i32,

    /// Number of LEDs on the strip
    pub leds: u16,
    /// First LED of the idle sub-range
    pub led_idle_start: u16,
    /// One past the last LED of the idle sub-range
    pub led_idle_end: u16,
    /// Colour letters cycled across steadily lit mirrored lamps
    pub mirror_colours: String,
    /// Seconds the mirrored panel pattern stays on the strip
    pub mirror_secs: u32,

    /// Panel width in pixels
    pub panel_width: u16,
    /// Panel height in pixels
    pub panel_height: u16,
    /// Swap ink and paper on the whole frame
    pub invert: bool,

    /// Postcode printed in the QR stamp, empty disables the stamp
    pub postcode: String,
    /// Account notified through the `toot` topic on a press
    pub toot: String,
    /// Bus device switched on by a press
    pub tas_bell: String,
    /// Bus device whose power state means away
    pub tas_away: String,
    /// Bus device whose power state means busy
    pub tas_busy: String,

    /// Placeholder while no idle artwork is available
    pub idle_text: String,
    /// Placeholder while no active artwork is available
    pub wait_text: String,
    /// Banner shown when an upgrade starts
    pub upgrade_text: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            app_name: "Doorbell".to_string(),
            image_url: String::new(),
            image_ext: "png".to_string(),
            mount: "/assets".to_string(),
            image_idle: "Example".to_string(),
            image_wait: "G:Wait".to_string(),
            image_busy: "Y:Busy".to_string(),
            image_away: "R:Away".to_string(),
            image_moon: String::new(),
            image_xmas: String::new(),
            image_east: String::new(),
            image_year: String::new(),
            image_hall: String::new(),
            hold_time: 30,
            refresh: 86400,
            refetch: 3600,
            retry: 60,
            utc_offset_minutes: 0,
            leds: 24,
            led_idle_start: 0,
            led_idle_end: 0,
            mirror_colours: "R".to_string(),
            mirror_secs: 10,
            panel_width: 240,
            panel_height: 400,
            invert: false,
            postcode: String::new(),
            toot: String::new(),
            tas_bell: String::new(),
            tas_away: String::new(),
            tas_busy: String::new(),
            idle_text: "/ / / / /PLEASE/RING/THE/BELL".to_string(),
            wait_text: "/ / / / / /PLEASE/WAIT".to_string(),
            upgrade_text: "UPGRADING".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.message().to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leds == 0 {
            return Err(ConfigError::Invalid("leds"));
        }
        if self.led_idle_start > self.led_idle_end || self.led_idle_end > self.leds {
            return Err(ConfigError::Invalid("led_idle_end"));
        }
        if self.hold_time == 0 {
            return Err(ConfigError::Invalid("hold_time"));
        }
        if self.panel_width == 0 || self.panel_height == 0 {
            return Err(ConfigError::Invalid("panel_width"));
        }
        if !(-14 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(ConfigError::Invalid("utc_offset_minutes"));
        }
        Ok(())
    }

    /// Byte length of a raw 1-bpp panel bitmap
    pub fn bitmap_len(&self) -> usize {
        (self.panel_width as usize * self.panel_height as usize).div_ceil(8)
    }

    /// LED indices that fade to grey instead of off
    pub fn idle_range(&self) -> core::ops::Range<usize> {
        self.led_idle_start as usize..self.led_idle_end as usize
    }

    /// Animator cycles covered by one mirrored pattern
    pub fn mirror_cycles(&self) -> u16 {
        let cycles = self.mirror_secs.saturating_mul(crate::led::CYCLES_PER_SECOND);
        cycles.min(u16::MAX as u32) as u16
    }
}
