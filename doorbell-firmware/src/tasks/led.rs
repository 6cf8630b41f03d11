//! LED strip animation task

use defmt::*;
use embassy_time::{Duration, Ticker};

use doorbell_core::led::{LedAnimator, CYCLE_MS};
use doorbell_core::traits::LedStrip;
use doorbell_core::{Context, Event};

use crate::board::Ws2812Strip;

#[embassy_executor::task]
pub async fn led_task(ctx: &'static Context, mut strip: Ws2812Strip) {
    info!("LED task started");

    let mut animator = LedAnimator::from_settings(ctx.settings());
    let mut ticker = Ticker::every(Duration::from_millis(CYCLE_MS));

    while !ctx.is_stopped() {
        ticker.next().await;

        let frame = ctx.indicator_frame();
        if let Some(pixels) = animator.step(frame) {
            if let Err(e) = strip.write(pixels).await {
                ctx.record(Event::LedFailed(e));
            }
        }
    }

    info!("LED task stopped");
}
