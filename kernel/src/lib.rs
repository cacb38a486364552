//! trios kernel library
//!
//! Process and execution core of a small single-CPU x86 protected-mode
//! kernel: paging windows, per-process descriptor tables, the execute/halt
//! protocol, and a timer-driven round-robin scheduler over three terminals.
//!
//! # Layout
//!
//! - Hardware-independent logic lives in the top-level modules and is
//!   driven through the [`platform::Platform`] trait.
//! - `arch::x86` implements that trait on real hardware and is only
//!   compiled for 32-bit x86.
//! - `cargo test` runs the core on the host against a mock platform.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod arch;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fs;
pub mod interrupts;
pub mod memory;
pub mod platform;
pub mod process;
pub mod scheduler;
pub mod state;
pub mod syscall;
pub mod terminal;
pub mod vfs;

#[cfg(test)]
mod tests;

pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use state::KernelState;
