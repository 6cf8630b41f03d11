//! Display driver trait for the bistable panel

use crate::cache::Content;

/// Errors from the display driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Panel did not finish a refresh in time
    Timeout,
    /// SPI or GPIO failure
    Bus,
    /// Content could not be decoded for the panel
    Decode,
}

/// Main area of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body<'a> {
    /// Cached content, image or structured text panel
    Content(&'a Content),
    /// Lines of text separated by `/`
    Message(&'a str),
}

/// Everything drawn in one pass
///
/// The driver replaces its whole buffer on each compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scene<'a> {
    pub body: Body<'a>,
    /// Clock overlay (hour, minute), bottom right
    pub clock: Option<(u8, u8)>,
    /// Text encoded as a QR stamp, bottom left
    pub stamp: Option<&'a str>,
}

/// Bistable display
///
/// `compose` only fills the frame buffer; nothing reaches the panel until
/// `flush`. The two are split so a frame can be composed while the caller
/// holds borrowed content, and flushed after releasing it.
pub trait DisplayDriver {
    /// Draw `scene` into the frame buffer
    fn compose(&mut self, scene: &Scene<'_>) -> Result<(), DisplayError>;

    /// Transmit the frame buffer
    ///
    /// `full` requests a full refresh cycle to clear ghosting.
    fn flush(&mut self, full: bool) -> impl core::future::Future<Output = Result<(), DisplayError>>;
}
