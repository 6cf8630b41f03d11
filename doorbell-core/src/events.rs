//! Observability events
//!
//! The core never logs. Anything worth logging becomes an [`Event`] pushed
//! onto the [`EventLog`] in the shared context; the firmware drains it and
//! logs each entry.

use heapless::{Deque, String};

use crate::command::{CommandError, CommandKind};
use crate::traits::{DisplayError, LedError, NotifyError, StorageError, TransportError};

/// Longest asset key or path carried in an event
pub const LABEL_LEN: usize = 48;

/// Events kept before the oldest is dropped
pub const EVENT_CAPACITY: usize = 32;

/// Asset key or path, truncated to [`LABEL_LEN`]
pub type Label = String<LABEL_LEN>;

/// Copy `text` into a label, truncating on a character boundary
pub fn label(text: &str) -> Label {
    let mut out = Label::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Something that happened
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Fetched bytes replaced the cached content
    AssetChanged { key: Label, len: u32 },
    /// Server reported the cached copy is current
    NotModified { key: Label },
    /// Remote fetch failed
    FetchFailed { key: Label, error: TransportError },
    /// Bytes matched no content probe and were discarded
    Unrecognized { key: Label, len: u32 },
    /// Changed content written to the local store
    Persisted { path: Label, len: u32 },
    /// Local store write failed
    PersistFailed { path: Label, error: StorageError },
    /// Content loaded from the local store
    LocalLoaded { path: Label, len: u32 },
    /// Local store read failed
    LocalFailed { path: Label, error: StorageError },
    /// Button press or push command started a pushed period
    Pushed,
    /// Pushed period ended or was cancelled
    PushEnded,
    /// Override content is on screen
    OverrideShown,
    /// Override asset could not be resolved and was dropped
    OverrideUnavailable { key: Label },
    /// Display driver failed
    DisplayFailed(DisplayError),
    /// Bus publish or subscribe failed
    NotifyFailed(NotifyError),
    /// Relay output could not be driven
    RelayFailed,
    /// LED strip transmit failed
    LedFailed(LedError),
    /// Panel lamp pattern changed and the mirror was armed
    MirrorArmed { steady: u32, blinking: u32 },
    /// Command applied to the shared state
    Command(CommandKind),
    /// Command could not be decoded
    CommandRejected(CommandError),
}

/// Bounded event queue, oldest dropped first
#[derive(Debug, Default)]
pub struct EventLog {
    queue: Deque<Event, EVENT_CAPACITY>,
    dropped: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event
    pub fn push(&mut self, event: Event) {
        if self.queue.is_full() {
            self.queue.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
        }
        // Cannot fail: a slot was freed above
        let _ = self.queue.push_back(event);
    }

    /// Oldest pending event
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    /// Events dropped because nobody drained the queue in time
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterate without draining
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_dropped_when_full() {
        let mut log = EventLog::new();
        for _ in 0..EVENT_CAPACITY {
            log.push(Event::Pushed);
        }
        log.push(Event::PushEnded);
        assert_eq!(log.len(), EVENT_CAPACITY);
        assert_eq!(log.dropped(), 1);
        assert_eq!(log.iter().last(), Some(&Event::PushEnded));
    }

    #[test]
    fn test_label_truncates() {
        let long = "x".repeat(100);
        assert_eq!(label(&long).len(), LABEL_LEN);
        assert_eq!(label("short").as_str(), "short");
    }
}
