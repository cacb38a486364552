//! Interval timer and CMOS real-time clock programming.

use super::port::{inb, outb};
use crate::config::PIT_BASE_FREQUENCY;
use crate::drivers::rtc::{CMOS_DATA_PORT, CMOS_INDEX_PORT};

const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;
/// Channel 0, lobyte/hibyte, square wave.
const PIT_MODE: u8 = 0x36;

/// Register selects with NMI disabled.
const RTC_REGISTER_A: u8 = 0x8A;
const RTC_REGISTER_B: u8 = 0x8B;
const RTC_REGISTER_C: u8 = 0x0C;
const RTC_PERIODIC_ENABLE: u8 = 0x40;
/// Rate select for 1024 Hz.
const RTC_RATE_1024HZ: u8 = 0x06;

/// Program PIT channel 0 to `frequency` Hz.
pub fn start_timer(frequency: u32) {
    let divisor = (PIT_BASE_FREQUENCY / frequency.max(1)).clamp(1, 0xFFFF);
    // SAFETY: PIT command and channel 0 data ports.
    unsafe {
        outb(PIT_COMMAND, PIT_MODE);
        outb(PIT_CHANNEL0, (divisor & 0xFF) as u8);
        outb(PIT_CHANNEL0, ((divisor >> 8) & 0xFF) as u8);
    }
}

unsafe fn cmos_read(register: u8) -> u8 {
    // SAFETY: guaranteed by the caller.
    unsafe {
        outb(CMOS_INDEX_PORT, register);
        inb(CMOS_DATA_PORT)
    }
}

unsafe fn cmos_write(register: u8, value: u8) {
    // SAFETY: guaranteed by the caller.
    unsafe {
        outb(CMOS_INDEX_PORT, register);
        outb(CMOS_DATA_PORT, value);
    }
}

/// Enable the periodic clock interrupt at 1024 Hz.
pub fn arm_periodic_clock() {
    // SAFETY: CMOS status registers A and B, accessed with NMI masked.
    unsafe {
        let b = cmos_read(RTC_REGISTER_B);
        cmos_write(RTC_REGISTER_B, b | RTC_PERIODIC_ENABLE);
        let a = cmos_read(RTC_REGISTER_A);
        cmos_write(RTC_REGISTER_A, (a & 0xF0) | RTC_RATE_1024HZ);
    }
}

/// Read register C so the clock raises its next interrupt.
pub fn acknowledge_clock() {
    // SAFETY: reading status register C only clears the interrupt flags.
    unsafe {
        cmos_read(RTC_REGISTER_C);
    }
}
