//! Serial port driver for console output.
//!
//! COM1 carries the kernel log. The `log` facade is routed here by
//! [`init_logger`].

use core::fmt;
use core::fmt::Write;

use lazy_static::lazy_static;
use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

use super::cpu;
use super::port::{inb, outb};
use crate::config::DEBUG_SERIAL_PORT;

/// Transmit holding register empty.
const LINE_STATUS_THR_EMPTY: u8 = 1 << 5;

/// A 16550 UART.
pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    /// # Safety
    ///
    /// `base` must be the I/O base of a 16550-compatible UART.
    pub const unsafe fn new(base: u16) -> Self {
        Self { base }
    }

    /// 38400 baud, 8N1, FIFOs on.
    pub fn init(&mut self) {
        // SAFETY: register offsets of a 16550 at `base`.
        unsafe {
            outb(self.base + 1, 0x00);
            outb(self.base + 3, 0x80);
            outb(self.base, 0x03);
            outb(self.base + 1, 0x00);
            outb(self.base + 3, 0x03);
            outb(self.base + 2, 0xC7);
            outb(self.base + 4, 0x0B);
        }
    }

    pub fn send(&mut self, byte: u8) {
        // SAFETY: polls line status, then writes the data register.
        unsafe {
            while inb(self.base + 5) & LINE_STATUS_THR_EMPTY == 0 {
                core::hint::spin_loop();
            }
            outb(self.base, byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.send(b'\r');
            }
            self.send(byte);
        }
        Ok(())
    }
}

lazy_static! {
    /// Global serial port (COM1).
    pub static ref SERIAL1: Mutex<SerialPort> = {
        // SAFETY: COM1 is present on every PC-compatible machine.
        let mut port = unsafe { SerialPort::new(DEBUG_SERIAL_PORT) };
        port.init();
        Mutex::new(port)
    };
}

/// Print macro for serial output.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::arch::x86::serial::_print(format_args!($($arg)*))
    };
}

/// Println macro for serial output.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => {
        $crate::serial_print!("{}\n", format_args!($($arg)*))
    };
}

/// Internal print function.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    // Masked so an interrupt handler cannot spin on a lock we hold.
    cpu::without_interrupts(|| {
        let _ = SERIAL1.lock().write_fmt(args);
    });
}

/// `log` sink writing to COM1.
struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(feature = "serial-console")]
        crate::serial_println!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Install the serial logger. Later calls are ignored.
pub fn init_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
