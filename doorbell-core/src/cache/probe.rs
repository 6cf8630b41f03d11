//! Content classification
//!
//! Bytes are offered to each probe in a fixed order and the first probe that
//! recognizes them decides what they are. Bytes no probe recognizes are never
//! stored.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use serde::Deserialize;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Zero-length IEND chunk including its CRC
const PNG_IEND: [u8; 12] = [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];

/// Signature, IHDR chunk and IEND chunk
const PNG_MIN_LEN: usize = 8 + 25 + 12;

/// Pixel dimensions the raw bitmap probe expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelSize {
    pub width: u16,
    pub height: u16,
}

impl PanelSize {
    /// Bytes in a packed 1-bpp frame
    pub fn bitmap_len(&self) -> usize {
        (self.width as usize * self.height as usize).div_ceil(8)
    }
}

/// Image encodings the panel can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageFormat {
    Png,
    /// Packed 1-bpp, row major, panel sized
    Bitmap,
}

/// Image metadata taken from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageMeta {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Structured text panel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextPanel {
    /// Lines separated by `/`
    pub message: String,
    /// Optional LED colour letters
    #[serde(default)]
    pub colour: Option<String>,
}

/// Result of classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Image(ImageMeta),
    Structured(TextPanel),
    Unrecognized,
}

type Probe = fn(&[u8], PanelSize) -> Option<Classified>;

/// Probes in priority order
const PROBES: [Probe; 3] = [probe_png, probe_bitmap, probe_structured];

/// Classify `bytes` by trying each probe in turn
pub fn classify(bytes: &[u8], panel: PanelSize) -> Classified {
    PROBES
        .iter()
        .find_map(|probe| probe(bytes, panel))
        .unwrap_or(Classified::Unrecognized)
}

/// PNG with a valid IHDR and a terminating IEND
fn probe_png(bytes: &[u8], _panel: PanelSize) -> Option<Classified> {
    if bytes.len() < PNG_MIN_LEN || bytes[..8] != PNG_SIGNATURE {
        return None;
    }

    let ihdr = &bytes[8..33];
    let len = u32::from_be_bytes([ihdr[0], ihdr[1], ihdr[2], ihdr[3]]);
    if len != 13 || &ihdr[4..8] != b"IHDR" {
        return None;
    }
    let crc = u32::from_be_bytes([ihdr[21], ihdr[22], ihdr[23], ihdr[24]]);
    if crc32fast::hash(&ihdr[4..21]) != crc {
        return None;
    }

    // Truncated downloads lose the trailer
    if !bytes.ends_with(&PNG_IEND) {
        return None;
    }

    let width = u32::from_be_bytes([ihdr[8], ihdr[9], ihdr[10], ihdr[11]]);
    let height = u32::from_be_bytes([ihdr[12], ihdr[13], ihdr[14], ihdr[15]]);
    if width == 0 || height == 0 {
        return None;
    }

    Some(Classified::Image(ImageMeta {
        format: ImageFormat::Png,
        width,
        height,
    }))
}

/// Raw panel-sized 1-bpp frame
fn probe_bitmap(bytes: &[u8], panel: PanelSize) -> Option<Classified> {
    (bytes.len() == panel.bitmap_len()).then_some(Classified::Image(ImageMeta {
        format: ImageFormat::Bitmap,
        width: u32::from(panel.width),
        height: u32::from(panel.height),
    }))
}

/// JSON text panel
fn probe_structured(bytes: &[u8], _panel: PanelSize) -> Option<Classified> {
    serde_json::from_slice::<TextPanel>(bytes)
        .ok()
        .map(Classified::Structured)
}

/// Classified content owned by the cache
///
/// Clones share the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    bytes: Arc<[u8]>,
    kind: Classified,
}

impl Content {
    /// Classify `bytes`, handing them back if no probe recognizes them
    pub fn new(bytes: Vec<u8>, panel: PanelSize) -> Result<Self, Vec<u8>> {
        match classify(&bytes, panel) {
            Classified::Unrecognized => Err(bytes),
            kind => Ok(Self {
                bytes: bytes.into(),
                kind,
            }),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Never [`Classified::Unrecognized`]
    pub fn kind(&self) -> &Classified {
        &self.kind
    }

    /// Colour letters carried by a text panel
    pub fn colour_tag(&self) -> Option<&str> {
        match &self.kind {
            Classified::Structured(panel) => panel.colour.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const PANEL: PanelSize = PanelSize {
        width: 16,
        height: 4,
    };

    /// Minimal PNG: signature, IHDR, IEND
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        let mut chunk = b"IHDR".to_vec();
        chunk.extend_from_slice(&width.to_be_bytes());
        chunk.extend_from_slice(&height.to_be_bytes());
        chunk.extend_from_slice(&[1, 0, 0, 0, 0]);
        out.extend_from_slice(&13u32.to_be_bytes());
        out.extend_from_slice(&chunk);
        out.extend_from_slice(&crc32fast::hash(&chunk).to_be_bytes());
        out.extend_from_slice(&PNG_IEND);
        out
    }

    #[test]
    fn test_iend_constant_crc() {
        assert_eq!(
            crc32fast::hash(b"IEND").to_be_bytes(),
            [0xAE, 0x42, 0x60, 0x82]
        );
    }

    #[test]
    fn test_png_recognized() {
        let kind = classify(&png(240, 400), PANEL);
        assert_eq!(
            kind,
            Classified::Image(ImageMeta {
                format: ImageFormat::Png,
                width: 240,
                height: 400
            })
        );
    }

    #[test]
    fn test_truncated_png_rejected() {
        let mut bytes = png(240, 400);
        bytes.truncate(bytes.len() - 4);
        assert_eq!(classify(&bytes, PANEL), Classified::Unrecognized);
    }

    #[test]
    fn test_png_bad_crc_rejected() {
        let mut bytes = png(240, 400);
        bytes[20] ^= 1;
        assert_eq!(classify(&bytes, PANEL), Classified::Unrecognized);
    }

    #[test]
    fn test_png_zero_size_rejected() {
        assert_eq!(classify(&png(0, 400), PANEL), Classified::Unrecognized);
    }

    #[test]
    fn test_bitmap_by_size() {
        let bytes = [0xAAu8; 8];
        assert_eq!(
            classify(&bytes, PANEL),
            Classified::Image(ImageMeta {
                format: ImageFormat::Bitmap,
                width: 16,
                height: 4
            })
        );
        assert_eq!(classify(&bytes[..7], PANEL), Classified::Unrecognized);
    }

    #[test]
    fn test_structured_panel() {
        let bytes = br#"{"message":"BACK/AT/TWO","colour":"Y"}"#;
        let content = Content::new(bytes.to_vec(), PANEL).unwrap();
        assert_eq!(content.colour_tag(), Some("Y"));
        match content.kind() {
            Classified::Structured(panel) => assert_eq!(panel.message, "BACK/AT/TWO"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_bytes_handed_back() {
        let bytes = b"<html>not found</html>".to_vec();
        assert_eq!(Content::new(bytes.clone(), PANEL), Err(bytes));
        assert_eq!(classify(br#""just a string""#, PANEL), Classified::Unrecognized);
    }
}
