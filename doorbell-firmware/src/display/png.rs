//! PNG decode onto the frame buffer
//!
//! Non-interlaced images of any colour type are reduced to ink or paper
//! by luminance and drawn centred. Pixels outside the panel are clipped.

use alloc::vec::Vec;

use miniz_oxide::inflate::decompress_to_vec_zlib_with_limit;

use doorbell_core::traits::DisplayError;

use super::frame::Framebuffer;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Luminance below this is ink
const THRESHOLD: u16 = 128;

/// Alpha below this shows paper
const ALPHA_THRESHOLD: u8 = 128;

/// Largest accepted width or height
const MAX_SIDE: u32 = 1024;

/// Image header fields
struct Header {
    width: u32,
    height: u32,
    depth: u8,
    colour: u8,
}

impl Header {
    fn channels(&self) -> Result<usize, DisplayError> {
        match self.colour {
            0 | 3 => Ok(1),
            2 => Ok(3),
            4 => Ok(2),
            6 => Ok(4),
            _ => Err(DisplayError::Decode),
        }
    }

    /// Bit depth allowed for the colour type
    fn valid_depth(&self) -> bool {
        match self.colour {
            0 => matches!(self.depth, 1 | 2 | 4 | 8 | 16),
            3 => matches!(self.depth, 1 | 2 | 4 | 8),
            _ => matches!(self.depth, 8 | 16),
        }
    }

    fn bits_per_pixel(&self) -> Result<usize, DisplayError> {
        Ok(self.channels()? * usize::from(self.depth))
    }

    /// Bytes per scanline, without the filter byte
    fn stride(&self) -> Result<usize, DisplayError> {
        Ok((self.width as usize * self.bits_per_pixel()?).div_ceil(8))
    }
}

/// Decode `bytes` into `frame`
pub fn draw(bytes: &[u8], frame: &mut Framebuffer) -> Result<(), DisplayError> {
    if bytes.len() < SIGNATURE.len() || bytes[..8] != SIGNATURE {
        return Err(DisplayError::Decode);
    }

    let mut header = None;
    let mut palette: &[u8] = &[];
    let mut data = Vec::new();

    let mut rest = &bytes[8..];
    while rest.len() >= 12 {
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if rest.len() < 12 + len {
            return Err(DisplayError::Decode);
        }
        let kind = &rest[4..8];
        let body = &rest[8..8 + len];
        match kind {
            b"IHDR" if len == 13 => {
                // Only method 0 filtering and no interlace
                if body[10] != 0 || body[11] != 0 || body[12] != 0 {
                    return Err(DisplayError::Decode);
                }
                header = Some(Header {
                    width: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
                    height: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
                    depth: body[8],
                    colour: body[9],
                });
            }
            b"PLTE" => palette = body,
            b"IDAT" => data.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        rest = &rest[12 + len..];
    }

    let header = header.ok_or(DisplayError::Decode)?;
    if !header.valid_depth() || header.width > MAX_SIDE || header.height > MAX_SIDE {
        return Err(DisplayError::Decode);
    }
    let stride = header.stride()?;
    let expected = (stride + 1) * header.height as usize;
    let mut raw =
        decompress_to_vec_zlib_with_limit(&data, expected).map_err(|_| DisplayError::Decode)?;
    if raw.len() != expected {
        return Err(DisplayError::Decode);
    }
    drop(data);

    unfilter(&mut raw, stride, header.bits_per_pixel()?.div_ceil(8))?;

    let left = (i64::from(frame.width()) - i64::from(header.width)) / 2;
    let top = (i64::from(frame.height()) - i64::from(header.height)) / 2;
    for y in 0..header.height {
        let start = y as usize * (stride + 1) + 1;
        let line = &raw[start..start + stride];
        for x in 0..header.width {
            let (px, py) = (left + i64::from(x), top + i64::from(y));
            if px < 0 || py < 0 {
                continue;
            }
            let ink = is_ink(&header, palette, line, x as usize)?;
            frame.set(px as u32, py as u32, ink);
        }
    }
    Ok(())
}

/// Reverse the per-scanline filters in place
fn unfilter(raw: &mut [u8], stride: usize, bpp: usize) -> Result<(), DisplayError> {
    let row_len = stride + 1;
    let rows = raw.len() / row_len;
    for row in 0..rows {
        let (done, current) = raw.split_at_mut(row * row_len);
        let prior = if row == 0 {
            None
        } else {
            Some(&done[(row - 1) * row_len + 1..])
        };
        let filter = current[0];
        let line = &mut current[1..row_len];
        for i in 0..stride {
            let a = if i >= bpp { line[i - bpp] } else { 0 };
            let b = prior.map_or(0, |p| p[i]);
            let c = if i >= bpp { prior.map_or(0, |p| p[i - bpp]) } else { 0 };
            line[i] = match filter {
                0 => line[i],
                1 => line[i].wrapping_add(a),
                2 => line[i].wrapping_add(b),
                3 => line[i].wrapping_add(((u16::from(a) + u16::from(b)) / 2) as u8),
                4 => line[i].wrapping_add(paeth(a, b, c)),
                _ => return Err(DisplayError::Decode),
            };
        }
    }
    Ok(())
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Sample `index` of a sub-byte or byte-wide channel
fn sample(line: &[u8], depth: u8, index: usize) -> u8 {
    match depth {
        8 => line[index],
        16 => line[index * 2],
        _ => {
            let bits = usize::from(depth);
            let per_byte = 8 / bits;
            let byte = line[index / per_byte];
            let shift = 8 - bits * (index % per_byte + 1);
            let mask = (1u8 << bits) - 1;
            let value = (byte >> shift) & mask;
            // Scale to 8 bits
            (u16::from(value) * 255 / u16::from(mask)) as u8
        }
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r) * 77 + u16::from(g) * 150 + u16::from(b) * 29) >> 8
}

fn is_ink(header: &Header, palette: &[u8], line: &[u8], x: usize) -> Result<bool, DisplayError> {
    let depth = header.depth;
    let (level, alpha) = match header.colour {
        0 => (u16::from(sample(line, depth, x)), u8::MAX),
        2 => {
            let i = x * 3;
            let (r, g, b) = (sample(line, depth, i), sample(line, depth, i + 1), sample(line, depth, i + 2));
            (luminance(r, g, b), u8::MAX)
        }
        3 => {
            // Palette indices are raw, not scaled
            let bits = usize::from(depth);
            let index = if depth == 8 {
                usize::from(line[x])
            } else {
                let byte = line[x * bits / 8];
                let shift = 8 - bits * (x % (8 / bits) + 1);
                usize::from((byte >> shift) & ((1u8 << bits) - 1))
            };
            let rgb = palette.get(index * 3..index * 3 + 3).ok_or(DisplayError::Decode)?;
            (luminance(rgb[0], rgb[1], rgb[2]), u8::MAX)
        }
        4 => {
            let i = x * 2;
            (u16::from(sample(line, depth, i)), sample(line, depth, i + 1))
        }
        6 => {
            let i = x * 4;
            let (r, g, b) = (sample(line, depth, i), sample(line, depth, i + 1), sample(line, depth, i + 2));
            (luminance(r, g, b), sample(line, depth, i + 3))
        }
        _ => return Err(DisplayError::Decode),
    };
    Ok(alpha >= ALPHA_THRESHOLD && level < THRESHOLD)
}
