//! Doorbell - E-paper doorbell and signage firmware
//!
//! Main firmware binary for RP2350 boards with a CYW43 radio. Shows
//! artwork fetched over HTTP on a bistable panel, rings a bell and drives
//! a status LED strip that can mirror an indicator panel.

#![no_std]
#![no_main]

extern crate alloc;

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{PIO0, PIO1, UART1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUartRx, Config as UartConfig};
use embassy_sync::mutex::Mutex;
use embassy_time::Instant;
use embedded_alloc::LlffHeap as Heap;
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use doorbell_core::{Context, Doorbell};

use crate::board::{DisplayLock, Ws2812Strip, MAX_LEDS};
use crate::bus::OutboxBus;
use crate::config::{embedded_settings, log_settings_summary, ConfigPersistence};
use crate::display::{Epd, Panel};
use crate::net::HttpTransport;
use crate::store::{FlashStore, FLASH_SIZE};

// Heap allocator for settings, downloads and image decoding
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 320KB
const HEAP_SIZE: usize = 320 * 1024;

/// Embedded default settings (compiled into firmware)
/// Edit doorbell.toml and rebuild to customize
const EMBEDDED_SETTINGS: &str = include_str!("../doorbell.toml");

/// Network credentials, fixed at build time
const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

mod board;
mod bus;
mod channels;
mod clock;
mod config;
mod display;
mod net;
mod store;
mod tasks;

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    PIO1_IRQ_0 => PioInterruptHandler<PIO1>;
});

// Static cells (must live forever for task references)
static CONTEXT: StaticCell<Context> = StaticCell::new();
static DISPLAY: StaticCell<DisplayLock> = StaticCell::new();
static RADIO_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Doorbell firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2350 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Load settings from flash (or use embedded defaults)
    let flash = Flash::<_, Async, FLASH_SIZE>::new(p.FLASH, p.DMA_CH3);
    let mut persistence = ConfigPersistence::new(FlashStore::new(flash));
    let settings = match persistence.load().await {
        Ok(settings) => {
            info!("Loaded settings from flash");
            settings
        }
        Err(e) => {
            // Nothing stored is the common case
            info!("No stored settings ({:?}), using embedded defaults", e);
            let settings = embedded_settings(EMBEDDED_SETTINGS);
            log_settings_summary(&settings);
            settings
        }
    };
    let storage = persistence.into_storage();

    if usize::from(settings.leds) > MAX_LEDS {
        warn!("{} LEDs configured, strip driver handles {}", settings.leds, MAX_LEDS);
    }
    let (panel_width, panel_height) = (settings.panel_width, settings.panel_height);
    let invert = settings.invert;

    let ctx: &'static Context = CONTEXT.init(Context::new(settings));

    // Radio on PIO0 (Pico 2 W: PWR=GP23, DIO=GP24, CS=GP25, CLK=GP29)
    let firmware = include_bytes!(concat!(env!("CYW43_FIRMWARE_DIR"), "/43439A0.bin"));
    let clm = include_bytes!(concat!(env!("CYW43_FIRMWARE_DIR"), "/43439A0_clm.bin"));

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio0 = Pio::new(p.PIO0, Irqs);
    let radio_spi = PioSpi::new(
        &mut pio0.common,
        pio0.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio0.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = RADIO_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, radio_spi, firmware).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("Radio initialized");

    // No hardware RNG in use; the seed only spreads local ports
    let seed = 0x5EED_D00B_E11u64 ^ Instant::now().as_ticks();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(tasks::net_task(net_runner)).unwrap();

    // E-paper on SPI1 (SCK=GP10, MOSI=GP11, CS=GP9, DC=GP8, RST=GP12, BUSY=GP13)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = 4_000_000;
    let spi = Spi::new_txonly(p.SPI1, p.PIN_10, p.PIN_11, p.DMA_CH1, spi_config);
    let spi_device = ExclusiveDevice::new_no_delay(spi, Output::new(p.PIN_9, Level::High)).unwrap();
    let epd = Epd::new(
        spi_device,
        Output::new(p.PIN_8, Level::Low),
        Output::new(p.PIN_12, Level::High),
        Input::new(p.PIN_13, Pull::None),
        panel_width,
        panel_height,
    );
    let mut panel = Panel::new(epd, panel_width, panel_height, invert);
    if let Err(e) = panel.init().await {
        warn!("Panel init failed: {:?}", e);
    }
    let display: &'static DisplayLock = DISPLAY.init(Mutex::new(panel));
    info!("Panel initialized ({}x{})", panel_width, panel_height);

    // LED strip on PIO1 (DATA=GP16)
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO1, Irqs);
    let program = PioWs2812Program::new(&mut common);
    let strip = Ws2812Strip::new(PioWs2812::new(&mut common, sm0, p.DMA_CH2, p.PIN_16, &program));
    info!("LED strip initialized");

    // Indicator panel serial stream on UART1 (RX=GP5)
    let rx_buf = RX_BUF.init([0u8; 256]);
    let panel_rx = BufferedUartRx::new(p.UART1, Irqs, p.PIN_5, rx_buf, UartConfig::default());
    info!("UART initialized for indicator panel");

    // Button (GP15, active low) and bell relay (GP14)
    let button = Input::new(p.PIN_15, Pull::Up);
    let relay = Output::new(p.PIN_14, Level::Low);

    let app = Doorbell::new(
        ctx,
        HttpTransport::new(stack, WIFI_SSID),
        storage,
        OutboxBus,
        relay,
    );

    // Spawn tasks
    spawner
        .spawn(tasks::wifi_task(control, stack, WIFI_SSID, WIFI_PASSWORD))
        .unwrap();
    spawner.spawn(tasks::logger_task(ctx)).unwrap();
    spawner.spawn(tasks::render_task(app, display)).unwrap();
    spawner.spawn(tasks::button_task(ctx, button)).unwrap();
    spawner.spawn(tasks::panel_rx_task(ctx, panel_rx)).unwrap();
    spawner.spawn(tasks::led_task(ctx, strip)).unwrap();
    spawner.spawn(tasks::commands_task(ctx)).unwrap();
    spawner.spawn(tasks::web_task(ctx, stack)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
    info!("Heap initialized: {} bytes", HEAP_SIZE);
}
