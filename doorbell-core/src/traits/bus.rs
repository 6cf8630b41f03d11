//! Message bus used for notifications and remote lamp subscriptions

/// Errors from the message bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyError {
    /// Client is not connected
    Disconnected,
    /// Outbound queue is full
    Full,
}

/// Message bus client
///
/// Both calls queue work for the client and return immediately.
pub trait Bus {
    /// Publish `payload` on `topic`
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NotifyError>;

    /// Subscribe to `topic`
    fn subscribe(&mut self, topic: &str) -> Result<(), NotifyError>;
}
