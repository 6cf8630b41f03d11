//! Panel lamp frame protocol
//!
//! The doorbell sits beside an existing panel that reports which of its lamps
//! are lit over a UART. This crate turns that byte stream into lamp snapshots
//! and debounces them into a pattern the LED strip can mirror.
//!
//! # Frame format
//!
//! ```text
//! ┌──────┬──────┬────────┬──────┬─────────────┬──────────┐
//! │ 0x5A │ 0xA5 │ LENGTH │ TYPE │ PAYLOAD     │ CHECKSUM │
//! │ 1B   │ 1B   │ 1B     │ 1B   │ LENGTH-1 B  │ 1B       │
//! └──────┴──────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! LENGTH counts TYPE plus PAYLOAD (1-64). CHECKSUM is the bitwise complement
//! of the byte sum of LENGTH, TYPE and PAYLOAD. The parser resynchronises on
//! the two sync bytes after any error.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;
pub mod mirror;

pub use frame::{Frame, FrameError, FrameParser, FRAME_SYNC, MAX_PAYLOAD_SIZE};
pub use messages::{LampStatus, PanelMessage, MSG_LAMPS};
pub use mirror::{DecoderStats, Lamp, LampDebouncer, LampPattern, MirrorDecoder};
