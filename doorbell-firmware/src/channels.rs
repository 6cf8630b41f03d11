//! Inter-task communication channels
//!
//! The MQTT client lives outside this firmware image's task set; it feeds
//! inbound messages into [`COMMANDS`] and drains [`BUS_OUTBOX`].

use alloc::string::String;
use alloc::vec::Vec;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Channel capacity for inbound bus messages
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for outbound bus traffic
const OUTBOX_CHANNEL_SIZE: usize = 8;

/// Message received from the bus
pub struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Work queued for the bus client
pub enum Outbound {
    Publish { topic: String, payload: String },
    Subscribe { topic: String },
}

/// Inbound bus messages, routed by the commands task
pub static COMMANDS: Channel<CriticalSectionRawMutex, Inbound, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Publishes and subscriptions for the bus client
pub static BUS_OUTBOX: Channel<CriticalSectionRawMutex, Outbound, OUTBOX_CHANNEL_SIZE> =
    Channel::new();
