//! Lamp debounce and the byte-stream decoder used by the mirror reader
//!
//! The panel's own lamps blink by design. Mirroring each frame as it arrives
//! would flicker the strip faster than anyone can see, so each lamp is
//! classified over the last three samples: a lamp that toggled on both of the
//! last two transitions is blinking, anything else is steady at its latest
//! value.

use crate::frame::FrameParser;
use crate::messages::{LampStatus, PanelMessage};

/// Classified lamp state after debouncing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LampPattern {
    /// Number of lamps described
    pub count: u8,
    /// Lamps that are steadily lit
    pub steady: u32,
    /// Lamps that are blinking
    pub blinking: u32,
}

/// How a single lamp should be mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lamp {
    Off,
    Steady,
    Blinking,
}

impl LampPattern {
    /// Classification of lamp `index`
    pub fn lamp(&self, index: u8) -> Lamp {
        if index >= self.count || index >= 32 {
            Lamp::Off
        } else if self.blinking & (1 << index) != 0 {
            Lamp::Blinking
        } else if self.steady & (1 << index) != 0 {
            Lamp::Steady
        } else {
            Lamp::Off
        }
    }
}

/// Three-sample hysteresis filter over lamp snapshots
#[derive(Debug, Clone, Default)]
pub struct LampDebouncer {
    /// Previous sample and the one before it
    history: [Option<LampStatus>; 2],
}

impl LampDebouncer {
    /// Create a debouncer with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a sample and classify it against the two before it
    pub fn accept(&mut self, sample: LampStatus) -> LampPattern {
        let [prev, prev2] = self.history;

        // A change in lamp count invalidates the history
        let prev = prev.filter(|p| p.count == sample.count);
        let prev2 = prev2.filter(|p| p.count == sample.count && prev.is_some());

        let blinking = match (prev, prev2) {
            (Some(p1), Some(p2)) => (sample.mask ^ p1.mask) & (p1.mask ^ p2.mask),
            _ => 0,
        };

        self.history = [Some(sample), prev];

        LampPattern {
            count: sample.count,
            steady: sample.mask & !blinking,
            blinking,
        }
    }
}

/// Statistics kept by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderStats {
    /// Frames that validated
    pub frames: u32,
    /// Frames rejected for length or checksum
    pub rejected: u32,
    /// Valid frames of a type we do not mirror
    pub ignored: u32,
}

/// Byte stream to lamp pattern decoder
///
/// Owns the rolling frame parser and the debounce history. Feed it whatever
/// the UART delivered; it reports a pattern only when the classified state
/// changes.
#[derive(Debug, Clone, Default)]
pub struct MirrorDecoder {
    parser: FrameParser,
    debouncer: LampDebouncer,
    last: Option<LampPattern>,
    stats: DecoderStats,
}

impl MirrorDecoder {
    /// Create a decoder with empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder statistics
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Feed received bytes
    ///
    /// Returns the newest pattern if any frame in `bytes` changed it.
    pub fn feed(&mut self, bytes: &[u8]) -> Option<LampPattern> {
        let mut changed = None;
        for &byte in bytes {
            match self.parser.feed(byte) {
                Ok(Some(frame)) => match PanelMessage::from_frame(&frame) {
                    Ok(PanelMessage::Lamps(status)) => {
                        self.stats.frames += 1;
                        if let Some(pattern) = self.accept(status) {
                            changed = Some(pattern);
                        }
                    }
                    Ok(PanelMessage::Other(_)) => {
                        self.stats.frames += 1;
                        self.stats.ignored += 1;
                    }
                    Err(_) => self.stats.rejected += 1,
                },
                Ok(None) => {}
                Err(_) => self.stats.rejected += 1,
            }
        }
        changed
    }

    fn accept(&mut self, status: LampStatus) -> Option<LampPattern> {
        let pattern = self.debouncer.accept(status);
        if self.last == Some(pattern) {
            return None;
        }
        self.last = Some(pattern);
        Some(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::messages::MSG_LAMPS;
    use heapless::Vec;

    fn lamps(mask: u32) -> LampStatus {
        LampStatus::new(8, mask)
    }

    fn encoded(mask: u8) -> Vec<u8, 16> {
        let frame = Frame::new(MSG_LAMPS, &[8, mask]).unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(&frame.encode_to_vec().unwrap()).unwrap();
        out
    }

    #[test]
    fn test_toggling_lamp_is_blinking() {
        let mut debouncer = LampDebouncer::new();
        debouncer.accept(lamps(0b1));
        debouncer.accept(lamps(0b0));
        let pattern = debouncer.accept(lamps(0b1));
        assert_eq!(pattern.lamp(0), Lamp::Blinking);

        // Keeps blinking while it keeps toggling, whatever the raw value
        let pattern = debouncer.accept(lamps(0b0));
        assert_eq!(pattern.lamp(0), Lamp::Blinking);
    }

    #[test]
    fn test_constant_lamp_is_steady() {
        let mut debouncer = LampDebouncer::new();
        for _ in 0..3 {
            debouncer.accept(lamps(0b10));
        }
        let pattern = debouncer.accept(lamps(0b10));
        assert_eq!(pattern.lamp(1), Lamp::Steady);
        assert_eq!(pattern.lamp(0), Lamp::Off);
        assert_eq!(pattern.blinking, 0);
    }

    #[test]
    fn test_single_change_is_taken_at_face_value() {
        let mut debouncer = LampDebouncer::new();
        debouncer.accept(lamps(0b0));
        debouncer.accept(lamps(0b0));
        let pattern = debouncer.accept(lamps(0b1));
        assert_eq!(pattern.lamp(0), Lamp::Steady);
    }

    #[test]
    fn test_two_samples_are_not_enough_to_blink() {
        let mut debouncer = LampDebouncer::new();
        debouncer.accept(lamps(0b1));
        let pattern = debouncer.accept(lamps(0b0));
        assert_eq!(pattern.blinking, 0);
        assert_eq!(pattern.lamp(0), Lamp::Off);
    }

    #[test]
    fn test_count_change_resets_history() {
        let mut debouncer = LampDebouncer::new();
        debouncer.accept(LampStatus::new(8, 0b1));
        debouncer.accept(LampStatus::new(8, 0b0));
        let pattern = debouncer.accept(LampStatus::new(4, 0b1));
        assert_eq!(pattern.lamp(0), Lamp::Steady);
    }

    #[test]
    fn test_decoder_reports_changes_only() {
        let mut decoder = MirrorDecoder::new();
        assert!(decoder.feed(&encoded(0b11)).is_some());
        assert!(decoder.feed(&encoded(0b11)).is_none());
        let changed = decoder.feed(&encoded(0b01)).unwrap();
        assert_eq!(changed.steady, 0b01);
        assert_eq!(decoder.stats().frames, 3);
    }

    #[test]
    fn test_decoder_handles_split_reads() {
        let mut decoder = MirrorDecoder::new();
        let bytes = encoded(0b100);
        let (head, tail) = bytes.split_at(3);
        assert!(decoder.feed(head).is_none());
        let pattern = decoder.feed(tail).unwrap();
        assert_eq!(pattern.lamp(2), Lamp::Steady);
    }

    #[test]
    fn test_decoder_counts_rejects() {
        let mut decoder = MirrorDecoder::new();
        let mut bytes = encoded(0b1);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x55;
        assert!(decoder.feed(&bytes).is_none());
        assert_eq!(decoder.stats().rejected, 1);
        assert_eq!(decoder.stats().frames, 0);
    }

    #[test]
    fn test_truncated_frame_produces_nothing() {
        let mut decoder = MirrorDecoder::new();
        assert!(decoder.feed(&[0x5A, 0xA5, 3, MSG_LAMPS]).is_none());
        assert_eq!(decoder.stats(), DecoderStats::default());
    }
}
