//! Indicator panel UART receive task
//!
//! Receives the panel's lamp frames and mirrors each new pattern on the
//! LED strip.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Read;

use doorbell_core::Context;
use doorbell_protocol::MirrorDecoder;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Longest wait for bytes before rechecking the stop flag
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Panel RX task - receives and decodes lamp frames
#[embassy_executor::task]
pub async fn panel_rx_task(ctx: &'static Context, mut rx: BufferedUartRx) {
    info!("Panel RX task started");

    let mut decoder = MirrorDecoder::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    while !ctx.is_stopped() {
        match with_timeout(READ_TIMEOUT, rx.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => {
                trace!("RX: {} bytes", n);
                if let Some(pattern) = decoder.feed(&buf[..n]) {
                    debug!("Lamp pattern: {:?}", pattern);
                    ctx.mirror(pattern);
                }
            }
            Ok(Ok(_)) | Err(_) => {
                // Nothing received
            }
            Ok(Err(e)) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }

    let stats = decoder.stats();
    info!(
        "Panel RX task stopped: {} frames, {} rejected, {} ignored",
        stats.frames, stats.rejected, stats.ignored
    );
}
