//! Event logger
//!
//! Drains the context's event queue and logs each entry.

use defmt::*;
use embassy_time::{Duration, Ticker};

use doorbell_core::{Context, Event};

/// Drain interval in milliseconds
pub const LOG_INTERVAL_MS: u64 = 100;

#[embassy_executor::task]
pub async fn logger_task(ctx: &'static Context) {
    info!("Logger task started");

    let mut ticker = Ticker::every(Duration::from_millis(LOG_INTERVAL_MS));
    loop {
        ticker.next().await;

        while let Some(event) = ctx.next_event() {
            log_event(&event);
        }

        // Drained once more after the stop so the last events are kept
        if ctx.is_stopped() {
            break;
        }
    }

    info!("Logger task stopped");
}

fn log_event(event: &Event) {
    match event {
        Event::FetchFailed { .. }
        | Event::Unrecognized { .. }
        | Event::PersistFailed { .. }
        | Event::LocalFailed { .. }
        | Event::OverrideUnavailable { .. }
        | Event::DisplayFailed(_)
        | Event::NotifyFailed(_)
        | Event::RelayFailed
        | Event::LedFailed(_)
        | Event::CommandRejected(_) => warn!("{:?}", event),
        Event::NotModified { .. } | Event::Command(_) | Event::MirrorArmed { .. } => {
            debug!("{:?}", event)
        }
        _ => info!("{:?}", event),
    }
}
