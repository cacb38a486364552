//! 32-bit protected-mode x86 support.
//!
//! Descriptor tables, the interrupt stubs, device programming and the
//! [`X86Platform`] implementation of the kernel's platform trait.

pub mod cpu;
pub mod devices;
pub mod entry;
pub mod gdt;
pub mod idt;
pub mod pic;
pub mod platform;
pub mod port;
pub mod serial;
pub mod switch;
pub mod vga;

pub use platform::X86Platform;
