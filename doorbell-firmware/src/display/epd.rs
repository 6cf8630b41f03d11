//! SSD16xx e-paper driver
//!
//! Monochrome SSD1680/SSD1683 class controllers over SPI with DC, reset
//! and busy lines. RAM bit 1 is white.

use embassy_time::{with_timeout, Duration, Timer};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::SpiDevice;

use doorbell_core::traits::DisplayError;

/// Longest a refresh may keep BUSY high
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SSD16xx commands
#[allow(dead_code)]
mod cmd {
    pub const DRIVER_OUTPUT: u8 = 0x01;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const TEMP_SENSOR: u8 = 0x18;
    pub const MASTER_ACTIVATE: u8 = 0x20;
    pub const UPDATE_CTRL2: u8 = 0x22;
    pub const WRITE_BW: u8 = 0x24;
    pub const WRITE_PREVIOUS: u8 = 0x26;
    pub const BORDER: u8 = 0x3C;
    pub const RAM_X_RANGE: u8 = 0x44;
    pub const RAM_Y_RANGE: u8 = 0x45;
    pub const RAM_X_COUNTER: u8 = 0x4E;
    pub const RAM_Y_COUNTER: u8 = 0x4F;
}

/// Update sequence: clock, analog, temperature, LUT, full waveform
const SEQUENCE_FULL: u8 = 0xF7;
/// Update sequence: differential waveform against the previous RAM
const SEQUENCE_PARTIAL: u8 = 0xFC;

/// E-paper panel driver
pub struct Epd<SPI, DC, RST, BUSY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    width: u16,
    height: u16,
}

impl<SPI, DC, RST, BUSY> Epd<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: Wait,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, width: u16, height: u16) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            width,
            height,
        }
    }

    /// Hardware reset and controller setup
    pub async fn init(&mut self) -> Result<(), DisplayError> {
        self.rst.set_low().map_err(|_| DisplayError::Bus)?;
        Timer::after_millis(10).await;
        self.rst.set_high().map_err(|_| DisplayError::Bus)?;
        Timer::after_millis(10).await;

        self.command(cmd::SW_RESET, &[]).await?;
        self.wait_idle().await?;

        let last_row = self.height - 1;
        let [row_lo, row_hi] = last_row.to_le_bytes();
        self.command(cmd::DRIVER_OUTPUT, &[row_lo, row_hi, 0x00]).await?;
        // X increments, then Y
        self.command(cmd::DATA_ENTRY, &[0x03]).await?;
        let last_col = (self.width / 8 - 1) as u8;
        self.command(cmd::RAM_X_RANGE, &[0x00, last_col]).await?;
        self.command(cmd::RAM_Y_RANGE, &[0x00, 0x00, row_lo, row_hi]).await?;
        self.command(cmd::BORDER, &[0x05]).await?;
        // Internal temperature sensor
        self.command(cmd::TEMP_SENSOR, &[0x80]).await?;
        self.wait_idle().await
    }

    /// Transmit a frame and run a refresh cycle
    ///
    /// After the refresh the frame is also written as the previous image so
    /// the next partial refresh diffs against it.
    pub async fn show(&mut self, frame: &[u8], full: bool) -> Result<(), DisplayError> {
        if full {
            self.write_ram(cmd::WRITE_PREVIOUS, frame).await?;
        }
        self.write_ram(cmd::WRITE_BW, frame).await?;

        let sequence = if full { SEQUENCE_FULL } else { SEQUENCE_PARTIAL };
        self.command(cmd::UPDATE_CTRL2, &[sequence]).await?;
        self.command(cmd::MASTER_ACTIVATE, &[]).await?;
        self.wait_idle().await?;

        self.write_ram(cmd::WRITE_PREVIOUS, frame).await
    }

    async fn write_ram(&mut self, register: u8, frame: &[u8]) -> Result<(), DisplayError> {
        self.command(cmd::RAM_X_COUNTER, &[0x00]).await?;
        self.command(cmd::RAM_Y_COUNTER, &[0x00, 0x00]).await?;
        self.command(register, frame).await
    }

    /// Send a command byte followed by its data
    async fn command(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|_| DisplayError::Bus)?;
        self.spi.write(&[command]).await.map_err(|_| DisplayError::Bus)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(|_| DisplayError::Bus)?;
            self.spi.write(data).await.map_err(|_| DisplayError::Bus)?;
        }
        Ok(())
    }

    async fn wait_idle(&mut self) -> Result<(), DisplayError> {
        match with_timeout(BUSY_TIMEOUT, self.busy.wait_for_low()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DisplayError::Bus),
            Err(_) => Err(DisplayError::Timeout),
        }
    }
}
