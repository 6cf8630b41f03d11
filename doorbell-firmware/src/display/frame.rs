//! 1-bpp frame buffer
//!
//! Rows are packed MSB first in the controller's RAM layout, bit 1 white.
//! Drawing goes through embedded-graphics; `BinaryColor::On` is ink.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use qrcodegen_no_heap::{QrCode, QrCodeEcc, Version};

use doorbell_core::traits::DisplayError;

/// Glyph cell of the message font
const GLYPH_WIDTH: u32 = 10;
const GLYPH_HEIGHT: u32 = 20;

/// Largest message text magnification
const MAX_SCALE: u32 = 4;

/// Margin around overlays
const MARGIN: i32 = 4;

/// QR module size in pixels
const QR_SCALE: i32 = 2;

/// Largest QR version tried for the stamp
const QR_MAX_VERSION: u8 = 6;

/// Panel-sized frame buffer
pub struct Framebuffer {
    width: u16,
    height: u16,
    bits: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let stride = (width as usize).div_ceil(8);
        Self {
            width,
            height,
            bits: vec![0xFF; stride * height as usize],
        }
    }

    fn stride(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Fill with white
    pub fn clear(&mut self) {
        self.bits.fill(0xFF);
    }

    /// Set one pixel; out of range coordinates are ignored
    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        if x >= u32::from(self.width) || y >= u32::from(self.height) {
            return;
        }
        let index = y as usize * self.stride() + x as usize / 8;
        let mask = 0x80 >> (x % 8);
        if ink {
            self.bits[index] &= !mask;
        } else {
            self.bits[index] |= mask;
        }
    }

    /// Copy a raw panel bitmap, already in RAM layout
    pub fn load_bitmap(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        if bytes.len() != self.bits.len() {
            return Err(DisplayError::Decode);
        }
        self.bits.copy_from_slice(bytes);
        Ok(())
    }

    /// Swap ink and paper
    pub fn invert(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = !*b);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Draw `/` separated lines, centred, as large as they fit
    pub fn draw_message(&mut self, text: &str) {
        let lines: Vec<&str> = text.split('/').collect();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1) as u32;
        let rows = lines.len() as u32;

        let width = u32::from(self.width);
        let height = u32::from(self.height);
        let scale = (width / (longest * GLYPH_WIDTH))
            .min(height / (rows * GLYPH_HEIGHT))
            .clamp(1, MAX_SCALE);

        let mut target = Scaled {
            frame: self,
            scale,
        };
        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let layout = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();

        let centre = (width / scale / 2) as i32;
        let top = ((height / scale).saturating_sub(rows * GLYPH_HEIGHT) / 2) as i32;
        for (row, line) in lines.iter().enumerate() {
            let y = top + row as i32 * GLYPH_HEIGHT as i32;
            let _ = Text::with_text_style(line, Point::new(centre, y), style, layout).draw(&mut target);
        }
    }

    /// Clock overlay, bottom right
    pub fn draw_clock(&mut self, hour: u8, minute: u8) {
        let mut text = heapless::String::<5>::new();
        let _ = core::fmt::write(&mut text, format_args!("{:02}:{:02}", hour, minute));

        let size = Size::new(5 * GLYPH_WIDTH + 2 * MARGIN as u32, GLYPH_HEIGHT + 2 * MARGIN as u32);
        let corner = Point::new(
            i32::from(self.width) - size.width as i32,
            i32::from(self.height) - size.height as i32,
        );
        let _ = Rectangle::new(corner, size)
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(self);

        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let layout = TextStyleBuilder::new().baseline(Baseline::Top).build();
        let origin = corner + Point::new(MARGIN, MARGIN);
        let _ = Text::with_text_style(&text, origin, style, layout).draw(self);
    }

    /// QR stamp overlay, bottom left
    ///
    /// Text too long for the largest version tried is skipped.
    pub fn draw_stamp(&mut self, text: &str) {
        let version = Version::new(QR_MAX_VERSION);
        let mut temp = vec![0u8; version.buffer_len()];
        let mut out = vec![0u8; version.buffer_len()];
        let Ok(qr) = QrCode::encode_text(
            text,
            &mut temp,
            &mut out,
            QrCodeEcc::Low,
            Version::MIN,
            version,
            None,
            true,
        ) else {
            return;
        };

        // One module of quiet zone
        let modules = qr.size() + 2;
        let side = (modules * QR_SCALE) as u32;
        let corner = Point::new(MARGIN, i32::from(self.height) - MARGIN - side as i32);
        let _ = Rectangle::new(corner, Size::new(side, side))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(self);

        for y in 0..qr.size() {
            for x in 0..qr.size() {
                if !qr.get_module(x, y) {
                    continue;
                }
                let px = corner.x + (x + 1) * QR_SCALE;
                let py = corner.y + (y + 1) * QR_SCALE;
                for dy in 0..QR_SCALE {
                    for dx in 0..QR_SCALE {
                        self.set((px + dx) as u32, (py + dy) as u32, true);
                    }
                }
            }
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.height))
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, colour) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set(point.x as u32, point.y as u32, colour.is_on());
            }
        }
        Ok(())
    }
}

/// Magnifying view of a frame buffer
struct Scaled<'a> {
    frame: &'a mut Framebuffer,
    scale: u32,
}

impl OriginDimensions for Scaled<'_> {
    fn size(&self) -> Size {
        self.frame.size() / self.scale
    }
}

impl DrawTarget for Scaled<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, colour) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32 * self.scale, point.y as u32 * self.scale);
            for dy in 0..self.scale {
                for dx in 0..self.scale {
                    self.frame.set(x + dx, y + dy, colour.is_on());
                }
            }
        }
        Ok(())
    }
}
