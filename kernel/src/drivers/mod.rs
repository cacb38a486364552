//! Device drivers.
//!
//! Only the device state lives here; port I/O is done by the platform.
//!
//! - **keyboard**: scancode decoding into terminal inputs
//! - **rtc**: per-terminal virtual clocks on top of the 1024 Hz hardware tick

pub mod keyboard;
pub mod rtc;

pub use keyboard::{KeyInput, KeyboardDecoder};
pub use rtc::VirtualClock;
