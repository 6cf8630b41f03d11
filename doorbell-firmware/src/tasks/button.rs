//! Doorbell button poller
//!
//! The button is level sensed: every poll while it is held restarts the
//! pushed period.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};

use doorbell_core::Context;

use crate::clock;

/// Poll interval in milliseconds
pub const POLL_INTERVAL_MS: u64 = 10;

#[embassy_executor::task]
pub async fn button_task(ctx: &'static Context, button: Input<'static>) {
    info!("Button task started");

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));
    let mut held = false;

    while !ctx.is_stopped() {
        ticker.next().await;

        let pressed = button.is_low();
        if pressed {
            if !held {
                info!("Button pressed");
            }
            ctx.press(clock::now());
        }
        held = pressed;
    }

    info!("Button task stopped");
}
