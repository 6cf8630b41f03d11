//! Bus client handle
//!
//! Queues publishes and subscriptions on [`BUS_OUTBOX`] for the MQTT
//! client to pick up.

use doorbell_core::traits::{Bus, NotifyError};

use crate::channels::{Outbound, BUS_OUTBOX};

/// Bus handle backed by the outbox channel
#[derive(Debug, Default, Clone, Copy)]
pub struct OutboxBus;

impl OutboxBus {
    fn send(&self, message: Outbound) -> Result<(), NotifyError> {
        BUS_OUTBOX.try_send(message).map_err(|_| NotifyError::Full)
    }
}

impl Bus for OutboxBus {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        self.send(Outbound::Publish {
            topic: topic.into(),
            payload: payload.into(),
        })
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), NotifyError> {
        self.send(Outbound::Subscribe { topic: topic.into() })
    }
}
