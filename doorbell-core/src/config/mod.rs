//! Configuration types
//!
//! Every tunable lives in [`Settings`], loaded from a TOML document in which
//! every key is optional.

pub mod settings;

pub use settings::*;
