//! Embassy async tasks
//!
//! Each task runs independently and shares state through the doorbell
//! context. Every loop exits once the context's stop flag is raised.

pub mod button;
pub mod commands;
pub mod led;
pub mod logger;
pub mod panel_rx;
pub mod render;
pub mod web;
pub mod wifi;

pub use button::button_task;
pub use commands::commands_task;
pub use led::led_task;
pub use logger::logger_task;
pub use panel_rx::panel_rx_task;
pub use render::render_task;
pub use web::web_task;
pub use wifi::{cyw43_task, net_task, wifi_task};
