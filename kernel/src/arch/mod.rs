//! Architecture-specific code.
//!
//! Only 32-bit protected-mode x86 is supported. The module is compiled for
//! the freestanding target alone; host builds use the mock platform in the
//! test suite instead.

#[cfg(all(target_arch = "x86", target_os = "none"))]
pub mod x86;
