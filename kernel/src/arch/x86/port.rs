//! I/O port access.

use core::arch::asm;

/// Read a byte from an I/O port.
///
/// # Safety
///
/// Port reads can have device side effects.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    // SAFETY: caller guarantees the port access is valid.
    unsafe {
        asm!("in al, dx", out("al") value, in("dx") port, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Write a byte to an I/O port.
///
/// # Safety
///
/// Port writes can reprogram hardware.
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    // SAFETY: caller guarantees the port access is valid.
    unsafe {
        asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }
}

/// Short delay for slow devices.
#[inline]
pub fn io_wait() {
    // SAFETY: port 0x80 is the unused POST diagnostic port.
    unsafe { outb(0x80, 0) }
}
