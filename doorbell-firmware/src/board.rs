//! Board wiring for a Pico 2 W
//!
//! | function        | pins                                   |
//! |-----------------|----------------------------------------|
//! | CYW43 radio     | GP23 power, GP24 data, GP25 CS, GP29 clock (PIO0) |
//! | e-paper (SPI1)  | GP10 SCK, GP11 MOSI, GP9 CS, GP8 DC, GP12 RST, GP13 BUSY |
//! | LED strip       | GP16 (PIO1)                            |
//! | panel UART1 RX  | GP5                                    |
//! | button          | GP15, active low                       |
//! | bell relay      | GP14                                   |

use embassy_rp::gpio::{Input, Output};
use embassy_rp::peripherals::{PIO1, SPI1};
use embassy_rp::pio_programs::ws2812::PioWs2812;
use embassy_rp::spi::{Async, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use smart_leds::RGB8;

use doorbell_core::traits::{LedError, LedStrip};
use doorbell_core::Doorbell;

use crate::bus::OutboxBus;
use crate::display::Panel;
use crate::net::HttpTransport;
use crate::store::FlashStore;

/// Longest strip the PIO driver transmits
pub const MAX_LEDS: usize = 64;

pub type PanelSpi = ExclusiveDevice<Spi<'static, SPI1, Async>, Output<'static>, NoDelay>;

pub type PanelDisplay = Panel<PanelSpi, Output<'static>, Output<'static>, Input<'static>>;

/// Display lock shared by the render loop
pub type DisplayLock = Mutex<CriticalSectionRawMutex, PanelDisplay>;

pub type App = Doorbell<'static, HttpTransport, FlashStore<'static>, OutboxBus, Output<'static>>;

/// WS2812 strip on PIO1
pub struct Ws2812Strip {
    driver: PioWs2812<'static, PIO1, 0, MAX_LEDS>,
    frame: [RGB8; MAX_LEDS],
}

impl Ws2812Strip {
    pub fn new(driver: PioWs2812<'static, PIO1, 0, MAX_LEDS>) -> Self {
        Self {
            driver,
            frame: [RGB8::default(); MAX_LEDS],
        }
    }
}

impl LedStrip for Ws2812Strip {
    async fn write(&mut self, pixels: &[RGB8]) -> Result<(), LedError> {
        if pixels.len() > MAX_LEDS {
            return Err(LedError::TooManyPixels);
        }
        // Pixels past the strip fall off the end
        self.frame[..pixels.len()].copy_from_slice(pixels);
        self.frame[pixels.len()..].fill(RGB8::default());
        self.driver.write(&self.frame).await;
        Ok(())
    }
}
