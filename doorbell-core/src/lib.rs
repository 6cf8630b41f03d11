//! Board-agnostic core logic for the doorbell firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Collaborator traits (transport, storage, bus, display, LED strip)
//! - Content cache with local store fallback
//! - Display orchestrator and idle artwork rules
//! - LED animator
//! - Command ingress
//! - Shared context and the render tick
//! - Settings

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod asset;
pub mod cache;
pub mod calendar;
pub mod command;
pub mod config;
pub mod context;
pub mod events;
pub mod led;
pub mod orchestrator;
pub mod runtime;
pub mod traits;

pub use calendar::Now;
pub use command::{Command, CommandError};
pub use config::Settings;
pub use context::{Context, Shared};
pub use events::Event;
pub use runtime::Doorbell;
