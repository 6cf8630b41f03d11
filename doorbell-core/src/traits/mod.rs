//! Collaborator traits
//!
//! These traits define the interface between the doorbell logic and the
//! board, network and display implementations that live in the firmware.

pub mod bus;
pub mod display;
pub mod led;
pub mod storage;
pub mod transport;

pub use bus::{Bus, NotifyError};
pub use display::{Body, DisplayDriver, DisplayError, Scene};
pub use led::{LedError, LedStrip};
pub use storage::{Storage, StorageError};
pub use transport::{FetchResponse, LinkInfo, Transport, TransportError};
