//! Radio and network stack tasks

use cyw43::{JoinOptions, ScanOptions};
use cyw43_pio::PioSpi;
use defmt::*;
use embassy_net::Stack;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_time::Timer;

use crate::net::{LinkStats, LINK};

/// Seconds between join attempts
const JOIN_RETRY_S: u64 = 10;

/// Seconds between link checks
const LINK_CHECK_S: u64 = 5;

#[embassy_executor::task]
pub async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Join the network and rejoin whenever the link drops
#[embassy_executor::task]
pub async fn wifi_task(
    mut control: cyw43::Control<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
) {
    info!("WiFi task started");

    loop {
        match control.join(ssid, JoinOptions::new(password.as_bytes())).await {
            Ok(()) => {
                info!("Joined {=str}", ssid);
                record_link(&mut control, ssid).await;

                stack.wait_config_up().await;
                if let Some(config) = stack.config_v4() {
                    info!("IPv4 address {}", config.address);
                }

                while stack.is_link_up() {
                    Timer::after_secs(LINK_CHECK_S).await;
                }
                warn!("WiFi link lost");
            }
            Err(e) => {
                warn!("WiFi join failed: status {}", e.status);
                Timer::after_secs(JOIN_RETRY_S).await;
            }
        }
    }
}

/// Record channel and signal strength of the joined network
async fn record_link(control: &mut cyw43::Control<'static>, ssid: &str) {
    let mut scanner = control.scan(ScanOptions::default()).await;
    while let Some(bss) = scanner.next().await {
        let len = usize::from(bss.ssid_len).min(bss.ssid.len());
        if &bss.ssid[..len] == ssid.as_bytes() {
            let stats = LinkStats {
                channel: (bss.chanspec & 0xFF) as u8,
                rssi: bss.rssi,
            };
            LINK.lock(|link| link.set(stats));
            debug!("Channel {}, {} dBm", stats.channel, stats.rssi);
            break;
        }
    }
}
