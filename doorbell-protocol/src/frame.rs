//! Frame encoding and decoding for the indicator panel link.
//!
//! Frame format:
//! - SYNC (2 bytes): 0x5A 0xA5 synchronization marker
//! - LENGTH (1 byte): number of body bytes that follow (TYPE + PAYLOAD, 1-64)
//! - TYPE (1 byte): message type identifier
//! - PAYLOAD (0-63 bytes): type-specific data
//! - CHECK (1 byte): complement of the wrapping sum of LENGTH, TYPE and PAYLOAD

use heapless::Vec;

/// Two-byte synchronization marker
pub const FRAME_SYNC: [u8; 2] = [0x5A, 0xA5];

/// Maximum body size (TYPE + PAYLOAD) in bytes
pub const MAX_BODY_SIZE: usize = 64;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = MAX_BODY_SIZE - 1;

/// Maximum complete frame size (SYNC + LENGTH + BODY + CHECK)
pub const MAX_FRAME_SIZE: usize = 2 + 1 + MAX_BODY_SIZE + 1;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Declared length is zero or larger than a body can be
    InvalidLength,
    /// Checksum mismatch
    InvalidChecksum,
    /// Frame is well formed but its contents are not understood
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type identifier
    pub msg_type: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given message type and payload
    pub fn new(msg_type: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            msg_type,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(msg_type: u8) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Calculate the check byte for frame data
    fn calculate_checksum(length: u8, msg_type: u8, payload: &[u8]) -> u8 {
        let sum = payload
            .iter()
            .fold(length.wrapping_add(msg_type), |acc, &b| acc.wrapping_add(b));
        !sum
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let body_len = 1 + self.payload.len();
        let frame_len = 2 + 1 + body_len + 1;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = body_len as u8;
        let checksum = Self::calculate_checksum(length, self.msg_type, &self.payload);

        buffer[..2].copy_from_slice(&FRAME_SYNC);
        buffer[2] = length;
        buffer[3] = self.msg_type;
        buffer[4..4 + self.payload.len()].copy_from_slice(&self.payload);
        buffer[4 + self.payload.len()] = checksum;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    expected_length: u8,
    msg_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the first marker byte
    WaitingForSync,
    /// Got the first marker byte, waiting for the second
    WaitingForSyncTail,
    /// Got the marker, waiting for LENGTH
    WaitingForLength,
    /// Got LENGTH, waiting for TYPE
    WaitingForType,
    /// Reading payload bytes
    ReadingPayload,
    /// Waiting for CHECK
    WaitingForChecksum,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForSync,
            buffer: Vec::new(),
            expected_length: 0,
            msg_type: 0,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForSync;
        self.buffer.clear();
        self.expected_length = 0;
        self.msg_type = 0;
    }

    /// True while a frame has been started but not completed
    pub fn in_frame(&self) -> bool {
        self.state != ParseState::WaitingForSync
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::WaitingForSync => {
                if byte == FRAME_SYNC[0] {
                    self.state = ParseState::WaitingForSyncTail;
                }
                // Line noise between frames is expected
                Ok(None)
            }
            ParseState::WaitingForSyncTail => {
                if byte == FRAME_SYNC[1] {
                    self.state = ParseState::WaitingForLength;
                } else if byte != FRAME_SYNC[0] {
                    self.state = ParseState::WaitingForSync;
                }
                Ok(None)
            }
            ParseState::WaitingForLength => {
                if byte == 0 || byte as usize > MAX_BODY_SIZE {
                    self.reset();
                    return Err(FrameError::InvalidLength);
                }
                self.expected_length = byte;
                self.state = ParseState::WaitingForType;
                Ok(None)
            }
            ParseState::WaitingForType => {
                self.msg_type = byte;
                self.buffer.clear();
                self.state = if self.expected_length == 1 {
                    ParseState::WaitingForChecksum
                } else {
                    ParseState::ReadingPayload
                };
                Ok(None)
            }
            ParseState::ReadingPayload => {
                // Cannot overflow: expected_length is bounded by MAX_BODY_SIZE
                let _ = self.buffer.push(byte);
                if self.buffer.len() + 1 == self.expected_length as usize {
                    self.state = ParseState::WaitingForChecksum;
                }
                Ok(None)
            }
            ParseState::WaitingForChecksum => {
                let expected_checksum =
                    Frame::calculate_checksum(self.expected_length, self.msg_type, &self.buffer);

                if byte != expected_checksum {
                    self.reset();
                    return Err(FrameError::InvalidChecksum);
                }

                let frame = Frame {
                    msg_type: self.msg_type,
                    payload: self.buffer.clone(),
                };

                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frame_encode_empty_payload() {
        let frame = Frame::empty(0x10);
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 5);
        assert_eq!(&buffer[..2], &FRAME_SYNC);
        assert_eq!(buffer[2], 1); // length covers TYPE only
        assert_eq!(buffer[3], 0x10);
        assert_eq!(buffer[4], !(1u8 + 0x10));
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let frame = Frame::new(0x4C, &[8, 0b1010_0101]).unwrap();
        let mut buffer = [0u8; 16];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 7);
        assert_eq!(buffer[2], 3);
        assert_eq!(buffer[3], 0x4C);
        assert_eq!(buffer[4], 8);
        assert_eq!(buffer[5], 0b1010_0101);
        let sum = 3u8.wrapping_add(0x4C).wrapping_add(8).wrapping_add(0b1010_0101);
        assert_eq!(buffer[6], !sum);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(0x4C, &[1, 2, 3, 4, 5]).unwrap();
        let encoded = original.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&encoded).unwrap().unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parser_invalid_checksum() {
        let frame = Frame::new(0x4C, &[4, 0x0F]).unwrap();
        let mut encoded = frame.encode_to_vec().unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        let mut parser = FrameParser::new();
        let result = parser.feed_bytes(&encoded);
        assert_eq!(result, Err(FrameError::InvalidChecksum));
        assert!(!parser.in_frame());
    }

    #[test]
    fn test_parser_resync_after_garbage() {
        let frame = Frame::empty(0x10);
        let encoded = frame.encode_to_vec().unwrap();

        // Garbage includes a lone first marker byte and a doubled one
        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[0x00, 0x5A, 0x12, 0xFF, 0x5A]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut parser = FrameParser::new();
        let parsed = parser.feed_bytes(&data).unwrap().unwrap();

        assert_eq!(parsed.msg_type, 0x10);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut parser = FrameParser::new();
        assert_eq!(
            parser.feed_bytes(&[0x5A, 0xA5, 0x00]),
            Err(FrameError::InvalidLength)
        );
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut parser = FrameParser::new();
        assert_eq!(
            parser.feed_bytes(&[0x5A, 0xA5, (MAX_BODY_SIZE + 1) as u8]),
            Err(FrameError::InvalidLength)
        );
    }

    #[test]
    fn test_marker_then_short_body_yields_nothing() {
        // Marker, a declared body of 5 bytes, but only 3 of them arrive
        let mut parser = FrameParser::new();
        let result = parser.feed_bytes(&[0x5A, 0xA5, 5, 0x4C, 1, 2]);
        assert_eq!(result, Ok(None));
        assert!(parser.in_frame());
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::new(0x4C, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    proptest! {
        #[test]
        fn truncated_frames_never_decode(
            payload in proptest::collection::vec(any::<u8>(), 0..MAX_PAYLOAD_SIZE),
            cut in 0usize..MAX_FRAME_SIZE,
        ) {
            let frame = Frame::new(0x4C, &payload).unwrap();
            let encoded = frame.encode_to_vec().unwrap();
            let cut = cut % encoded.len();

            let mut parser = FrameParser::new();
            for &byte in &encoded[..cut] {
                prop_assert_eq!(parser.feed(byte), Ok(None));
            }
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut parser = FrameParser::new();
            for byte in bytes {
                let _ = parser.feed(byte);
            }
        }
    }
}
