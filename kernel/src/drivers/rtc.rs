//! Virtualized real-time clock.
//!
//! The hardware clock runs at a fixed 1024 Hz. Every terminal sees its own
//! clock whose rate is set by writing a frequency to the clock file; a read
//! blocks until the next tick at that rate.

use core::task::Poll;

use crate::config::{RTC_BASE_FREQUENCY, RTC_DEFAULT_FREQUENCY, TERMINAL_COUNT};
use crate::error::{KernelError, KernelResult};
use crate::terminal::TerminalId;

/// CMOS index port
pub const CMOS_INDEX_PORT: u16 = 0x70;
/// CMOS data port
pub const CMOS_DATA_PORT: u16 = 0x71;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Idle,
    Armed,
    Elapsed,
}

pub struct VirtualClock {
    ticks: u32,
    divisors: [u32; TERMINAL_COUNT],
    waits: [Wait; TERMINAL_COUNT],
}

impl VirtualClock {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            divisors: [RTC_BASE_FREQUENCY / RTC_DEFAULT_FREQUENCY; TERMINAL_COUNT],
            waits: [Wait::Idle; TERMINAL_COUNT],
        }
    }

    /// Reset `terminal` to the default rate.
    pub fn open(&mut self, terminal: TerminalId) {
        self.divisors[terminal] = RTC_BASE_FREQUENCY / RTC_DEFAULT_FREQUENCY;
        self.waits[terminal] = Wait::Idle;
    }

    /// Set `terminal`'s rate. Must be a power of two between 2 and 1024 Hz.
    pub fn set_frequency(&mut self, terminal: TerminalId, frequency: i32) -> KernelResult<()> {
        let hz = u32::try_from(frequency).map_err(|_| KernelError::InvalidArgument)?;
        if !hz.is_power_of_two() || !(2..=RTC_BASE_FREQUENCY).contains(&hz) {
            return Err(KernelError::InvalidArgument);
        }
        self.divisors[terminal] = RTC_BASE_FREQUENCY / hz;
        Ok(())
    }

    pub fn frequency(&self, terminal: TerminalId) -> u32 {
        RTC_BASE_FREQUENCY / self.divisors[terminal]
    }

    /// Wait for the next tick of `terminal`'s clock.
    pub fn poll_wait(&mut self, terminal: TerminalId) -> Poll<()> {
        match self.waits[terminal] {
            Wait::Idle => {
                self.waits[terminal] = Wait::Armed;
                Poll::Pending
            }
            Wait::Armed => Poll::Pending,
            Wait::Elapsed => {
                self.waits[terminal] = Wait::Idle;
                Poll::Ready(())
            }
        }
    }

    /// Account one hardware tick.
    pub fn on_interrupt(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        for (wait, divisor) in self.waits.iter_mut().zip(self.divisors) {
            if *wait == Wait::Armed && self.ticks % divisor == 0 {
                *wait = Wait::Elapsed;
            }
        }
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks_until_ready(clock: &mut VirtualClock, terminal: TerminalId) -> u32 {
        assert_eq!(clock.poll_wait(terminal), Poll::Pending);
        let mut ticks = 0;
        loop {
            clock.on_interrupt();
            ticks += 1;
            if clock.poll_wait(terminal).is_ready() {
                return ticks;
            }
            assert!(ticks <= RTC_BASE_FREQUENCY, "clock never fired");
        }
    }

    #[test]
    fn test_default_rate() {
        let mut clock = VirtualClock::new();
        assert_eq!(clock.frequency(0), 2);
        assert_eq!(ticks_until_ready(&mut clock, 0), 512);
    }

    #[test]
    fn test_frequency_validation() {
        let mut clock = VirtualClock::new();
        assert_eq!(clock.set_frequency(0, 0), Err(KernelError::InvalidArgument));
        assert_eq!(clock.set_frequency(0, 1), Err(KernelError::InvalidArgument));
        assert_eq!(clock.set_frequency(0, 3), Err(KernelError::InvalidArgument));
        assert_eq!(clock.set_frequency(0, 2048), Err(KernelError::InvalidArgument));
        assert_eq!(clock.set_frequency(0, -4), Err(KernelError::InvalidArgument));
        assert_eq!(clock.set_frequency(0, 1024), Ok(()));
        assert_eq!(clock.frequency(0), 1024);
    }

    #[test]
    fn test_terminals_independent() {
        let mut clock = VirtualClock::new();
        clock.set_frequency(1, 1024).unwrap();
        clock.set_frequency(2, 256).unwrap();

        assert_eq!(ticks_until_ready(&mut clock, 1), 1);
        assert!(ticks_until_ready(&mut clock, 2) <= 4);
        assert_eq!(clock.frequency(0), 2);
    }

    #[test]
    fn test_open_resets_rate() {
        let mut clock = VirtualClock::new();
        clock.set_frequency(0, 64).unwrap();
        clock.open(0);
        assert_eq!(clock.frequency(0), 2);
    }
}
