//! Message types carried by panel frames
//!
//! The panel sends several kinds of frame; only the lamp status frame is
//! understood. Everything else is reported as [`PanelMessage::Other`] so the
//! reader can count it without treating it as an error.

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use heapless::Vec;

/// Lamp status frame: `[count][mask bytes, LSB first]`
pub const MSG_LAMPS: u8 = 0x4C;

/// Largest lamp count a lamp status frame can describe
pub const MAX_LAMPS: u8 = 32;

/// Snapshot of which panel lamps are lit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LampStatus {
    /// Number of lamps described (1-32)
    pub count: u8,
    /// Bit `n` set means lamp `n` is lit
    pub mask: u32,
}

impl LampStatus {
    /// Create a lamp snapshot, dropping bits beyond `count`
    pub fn new(count: u8, mask: u32) -> Self {
        let count = count.min(MAX_LAMPS);
        Self {
            count,
            mask: mask & Self::count_mask(count),
        }
    }

    /// Mask with one bit set per described lamp
    pub fn count_mask(count: u8) -> u32 {
        if count >= 32 {
            u32::MAX
        } else {
            (1u32 << count) - 1
        }
    }

    /// Whether lamp `index` is lit
    pub fn is_lit(&self, index: u8) -> bool {
        index < self.count && self.mask & (1 << index) != 0
    }
}

/// Messages parsed from panel frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelMessage {
    /// Lamp status snapshot
    Lamps(LampStatus),
    /// Any other frame type
    Other(u8),
}

impl PanelMessage {
    /// Parse a message from a validated frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.msg_type {
            MSG_LAMPS => {
                let (&count, mask_bytes) =
                    frame.payload.split_first().ok_or(FrameError::InvalidFrame)?;
                if count == 0 || count > MAX_LAMPS {
                    return Err(FrameError::InvalidFrame);
                }
                let needed = count.div_ceil(8) as usize;
                if mask_bytes.len() != needed {
                    return Err(FrameError::InvalidFrame);
                }
                let mask = mask_bytes
                    .iter()
                    .enumerate()
                    .fold(0u32, |acc, (i, &b)| acc | (u32::from(b) << (8 * i)));
                Ok(PanelMessage::Lamps(LampStatus::new(count, mask)))
            }
            other => Ok(PanelMessage::Other(other)),
        }
    }

    /// Encode this message into a frame (for testing or simulation)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            PanelMessage::Lamps(status) => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                payload
                    .push(status.count)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                let bytes = status.mask.to_le_bytes();
                payload
                    .extend_from_slice(&bytes[..status.count.div_ceil(8) as usize])
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Frame::new(MSG_LAMPS, &payload)
            }
            PanelMessage::Other(msg_type) => Ok(Frame::empty(*msg_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamps_from_frame() {
        let frame = Frame::new(MSG_LAMPS, &[12, 0b0000_0101, 0b0000_1000]).unwrap();
        let msg = PanelMessage::from_frame(&frame).unwrap();
        let PanelMessage::Lamps(status) = msg else {
            panic!("expected lamps");
        };
        assert_eq!(status.count, 12);
        assert_eq!(status.mask, 0b1000_0000_0101);
        assert!(status.is_lit(0));
        assert!(!status.is_lit(1));
        assert!(status.is_lit(11));
        assert!(!status.is_lit(12));
    }

    #[test]
    fn test_lamps_wrong_mask_length() {
        let frame = Frame::new(MSG_LAMPS, &[12, 0xFF]).unwrap();
        assert_eq!(
            PanelMessage::from_frame(&frame),
            Err(FrameError::InvalidFrame)
        );
    }

    #[test]
    fn test_lamps_bits_beyond_count_dropped() {
        let frame = Frame::new(MSG_LAMPS, &[3, 0xFF]).unwrap();
        let msg = PanelMessage::from_frame(&frame).unwrap();
        assert_eq!(msg, PanelMessage::Lamps(LampStatus { count: 3, mask: 0b111 }));
    }

    #[test]
    fn test_lamps_count_bounds() {
        let empty = Frame::new(MSG_LAMPS, &[0]).unwrap();
        assert!(PanelMessage::from_frame(&empty).is_err());

        let too_many = Frame::new(MSG_LAMPS, &[33, 0, 0, 0, 0, 0]).unwrap();
        assert!(PanelMessage::from_frame(&too_many).is_err());
    }

    #[test]
    fn test_other_frame_types_pass_through() {
        let frame = Frame::new(0x21, &[1, 2, 3]).unwrap();
        assert_eq!(PanelMessage::from_frame(&frame), Ok(PanelMessage::Other(0x21)));
    }

    #[test]
    fn test_lamps_roundtrip() {
        let original = PanelMessage::Lamps(LampStatus::new(32, 0xDEAD_BEEF));
        let frame = original.to_frame().unwrap();
        assert_eq!(PanelMessage::from_frame(&frame), Ok(original));
    }
}
