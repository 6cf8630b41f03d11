//! LED strip transmit driver

use smart_leds::RGB8;

/// Errors from the strip driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    /// More pixels than the strip holds
    TooManyPixels,
    /// Transmit failed
    Transmit,
}

/// Addressable LED strip
pub trait LedStrip {
    /// Transmit one frame, pixel 0 first
    fn write(&mut self, pixels: &[RGB8]) -> impl core::future::Future<Output = Result<(), LedError>>;
}
