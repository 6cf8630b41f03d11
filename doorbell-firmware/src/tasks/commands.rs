//! Bus command task
//!
//! Routes inbound bus messages through command ingress.

use defmt::*;
use embassy_time::{with_timeout, Duration};

use doorbell_core::{Command, Context};

use crate::channels::COMMANDS;
use crate::clock;

/// Longest wait for a message before rechecking the stop flag
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

#[embassy_executor::task]
pub async fn commands_task(ctx: &'static Context) {
    info!("Commands task started");

    let hostname = ctx.settings().hostname.as_str();

    while !ctx.is_stopped() {
        let Ok(message) = with_timeout(RECEIVE_TIMEOUT, COMMANDS.receive()).await else {
            continue;
        };

        match Command::from_topic(&message.topic, &message.payload, hostname) {
            Some(Ok(command)) => ctx.apply(command, clock::now()),
            Some(Err(e)) => ctx.reject(e),
            None => trace!("Ignoring topic {=str}", message.topic.as_str()),
        }
    }

    info!("Commands task stopped");
}
