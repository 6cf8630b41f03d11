//! Bistable panel
//!
//! [`Panel`] composes scenes into a RAM frame buffer and pushes them to an
//! SSD16xx e-paper controller.
//!
//! Layout of a frame:
//! - Body: a decoded image, a raw panel bitmap, or `/` separated message
//!   lines drawn as large as they fit
//! - Clock: `HH:MM`, bottom right
//! - Stamp: QR code, bottom left
//!
//! An inverted panel has the finished frame flipped before it is sent.

pub mod epd;
pub mod frame;
pub mod png;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::SpiDevice;

use doorbell_core::cache::{Classified, ImageFormat};
use doorbell_core::traits::{Body, DisplayDriver, DisplayError, Scene};

pub use epd::Epd;
use frame::Framebuffer;

/// E-paper panel with its frame buffer
pub struct Panel<SPI, DC, RST, BUSY> {
    epd: Epd<SPI, DC, RST, BUSY>,
    frame: Framebuffer,
    invert: bool,
}

impl<SPI, DC, RST, BUSY> Panel<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    pub fn new(epd: Epd<SPI, DC, RST, BUSY>, width: u16, height: u16, invert: bool) -> Self {
        Self {
            epd,
            frame: Framebuffer::new(width, height),
            invert,
        }
    }

    /// Reset and configure the controller
    pub async fn init(&mut self) -> Result<(), DisplayError> {
        self.epd.init().await
    }

    fn draw_body(&mut self, body: &Body<'_>) -> Result<(), DisplayError> {
        match body {
            Body::Message(text) => {
                self.frame.draw_message(text);
                Ok(())
            }
            Body::Content(content) => match content.kind() {
                Classified::Image(meta) => match meta.format {
                    ImageFormat::Png => png::draw(content.bytes(), &mut self.frame),
                    ImageFormat::Bitmap => self.frame.load_bitmap(content.bytes()),
                },
                Classified::Structured(panel) => {
                    self.frame.draw_message(&panel.message);
                    Ok(())
                }
                Classified::Unrecognized => Err(DisplayError::Decode),
            },
        }
    }
}

impl<SPI, DC, RST, BUSY> DisplayDriver for Panel<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    fn compose(&mut self, scene: &Scene<'_>) -> Result<(), DisplayError> {
        self.frame.clear();
        self.draw_body(&scene.body)?;
        if let Some((hour, minute)) = scene.clock {
            self.frame.draw_clock(hour, minute);
        }
        if let Some(stamp) = scene.stamp {
            self.frame.draw_stamp(stamp);
        }
        if self.invert {
            self.frame.invert();
        }
        Ok(())
    }

    async fn flush(&mut self, full: bool) -> Result<(), DisplayError> {
        self.epd.show(self.frame.as_bytes(), full).await
    }
}
