//! Render tick
//!
//! Drives the display orchestrator once per period: commands and button
//! presses queued since the last tick take effect here.

use defmt::*;
use embassy_time::{Duration, Ticker};

use crate::board::{App, DisplayLock};
use crate::clock;

/// Render tick period in milliseconds
pub const RENDER_PERIOD_MS: u64 = 1000;

/// Render task - clears the panel, then ticks the orchestrator
#[embassy_executor::task]
pub async fn render_task(mut app: App, display: &'static DisplayLock) {
    info!("Render task started");

    let ctx = app.context();
    app.clear(display).await;

    let mut ticker = Ticker::every(Duration::from_millis(RENDER_PERIOD_MS));
    while !ctx.is_stopped() {
        ticker.next().await;
        app.tick(display, clock::now()).await;
    }

    info!("Render task stopped");
}
