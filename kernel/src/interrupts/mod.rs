//! Interrupt and exception policy.
//!
//! The descriptor table itself is installed by the boot code. This module
//! names the hardware interrupt lines the kernel uses, abstracts the
//! interrupt controller, and decides what a CPU exception does to the
//! running process.
//!
//! # Policy
//!
//! - **Page fault from user mode**: the running process is terminated and
//!   its parent observes [`FAULT_EXIT_STATUS`].
//! - **Anything else**: logged and treated as fatal.

use core::fmt;

use crate::config::FAULT_EXIT_STATUS;
use crate::fs::FileSystem;
use crate::platform::Platform;
use crate::process::exec::HaltOutcome;
use crate::state::KernelState;

/// A line on the legacy interrupt controller pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Irq(pub u8);

impl Irq {
    /// Programmable interval timer.
    pub const TIMER: Irq = Irq(0);
    /// PS/2 keyboard.
    pub const KEYBOARD: Irq = Irq(1);
    /// Slave controller cascade.
    pub const CASCADE: Irq = Irq(2);
    /// Real-time clock.
    pub const CLOCK: Irq = Irq(8);

    /// Whether this line sits on the slave controller.
    pub const fn is_slave(self) -> bool {
        self.0 >= 8
    }
}

/// Interrupt vector numbers.
pub mod vectors {
    /// First vector the master controller is remapped to.
    pub const PIC1_OFFSET: u8 = 0x20;
    /// First vector the slave controller is remapped to.
    pub const PIC2_OFFSET: u8 = 0x28;
    /// Software interrupt used for system calls.
    pub const SYSCALL: u8 = 0x80;
}

/// Masking and end-of-interrupt signalling for hardware lines.
pub trait InterruptController {
    /// Unmask `irq`.
    fn enable_irq(&mut self, irq: Irq);
    /// Mask `irq`.
    fn disable_irq(&mut self, irq: Irq);
    /// Send end-of-interrupt for `irq`.
    fn acknowledge(&mut self, irq: Irq);
}

/// CPU exceptions 0 through 19.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exception {
    DivideError = 0,
    Debug = 1,
    NonMaskableInterrupt = 2,
    Breakpoint = 3,
    Overflow = 4,
    BoundRangeExceeded = 5,
    InvalidOpcode = 6,
    DeviceNotAvailable = 7,
    DoubleFault = 8,
    CoprocessorSegmentOverrun = 9,
    InvalidTss = 10,
    SegmentNotPresent = 11,
    StackSegmentFault = 12,
    GeneralProtection = 13,
    PageFault = 14,
    Reserved = 15,
    FloatingPoint = 16,
    AlignmentCheck = 17,
    MachineCheck = 18,
    SimdFloatingPoint = 19,
}

impl Exception {
    const ALL: [Exception; 20] = [
        Exception::DivideError,
        Exception::Debug,
        Exception::NonMaskableInterrupt,
        Exception::Breakpoint,
        Exception::Overflow,
        Exception::BoundRangeExceeded,
        Exception::InvalidOpcode,
        Exception::DeviceNotAvailable,
        Exception::DoubleFault,
        Exception::CoprocessorSegmentOverrun,
        Exception::InvalidTss,
        Exception::SegmentNotPresent,
        Exception::StackSegmentFault,
        Exception::GeneralProtection,
        Exception::PageFault,
        Exception::Reserved,
        Exception::FloatingPoint,
        Exception::AlignmentCheck,
        Exception::MachineCheck,
        Exception::SimdFloatingPoint,
    ];

    /// Decode a vector number.
    pub fn from_vector(vector: u8) -> Option<Exception> {
        Self::ALL.get(vector as usize).copied()
    }

    /// Human-readable name printed when the exception is taken.
    pub const fn name(self) -> &'static str {
        match self {
            Exception::DivideError => "Divide Error",
            Exception::Debug => "Debug",
            Exception::NonMaskableInterrupt => "Non-Maskable Interrupt",
            Exception::Breakpoint => "Breakpoint",
            Exception::Overflow => "Overflow",
            Exception::BoundRangeExceeded => "BOUND Range Exceeded",
            Exception::InvalidOpcode => "Invalid Opcode",
            Exception::DeviceNotAvailable => "Device Not Available",
            Exception::DoubleFault => "Double Fault",
            Exception::CoprocessorSegmentOverrun => "Coprocessor Segment Overrun",
            Exception::InvalidTss => "Invalid TSS",
            Exception::SegmentNotPresent => "Segment Not Present",
            Exception::StackSegmentFault => "Stack-Segment Fault",
            Exception::GeneralProtection => "General Protection",
            Exception::PageFault => "Page Fault",
            Exception::Reserved => "Reserved",
            Exception::FloatingPoint => "x87 Floating-Point Error",
            Exception::AlignmentCheck => "Alignment Check",
            Exception::MachineCheck => "Machine Check",
            Exception::SimdFloatingPoint => "SIMD Floating-Point Exception",
        }
    }

    /// Whether the exception kills the offending process rather than the system.
    pub const fn terminates_process(self, from_user: bool) -> bool {
        matches!(self, Exception::PageFault) && from_user
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name(), *self as u8)
    }
}

/// Saved state the exception stub hands to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultInfo {
    pub vector: u8,
    pub error_code: u32,
    /// CR2 for page faults.
    pub address: u32,
    /// The faulting code ran at privilege level 3.
    pub from_user: bool,
}

/// What the platform does after an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The running process was halted; continue with the outcome.
    Terminated(HaltOutcome),
    /// Stop the machine.
    Fatal,
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    /// Apply the exception policy to a fault.
    pub fn handle_exception(&mut self, fault: FaultInfo) -> FaultOutcome {
        let Some(exception) = Exception::from_vector(fault.vector) else {
            log::error!("unexpected exception vector {}", fault.vector);
            return FaultOutcome::Fatal;
        };

        if exception == Exception::PageFault {
            log::error!(
                "EXCEPTION: {} at {:#010x} (error code {:#x})",
                exception,
                fault.address,
                fault.error_code
            );
        } else {
            log::error!("EXCEPTION: {} (error code {:#x})", exception, fault.error_code);
        }

        if !exception.terminates_process(fault.from_user) {
            return FaultOutcome::Fatal;
        }
        let Some(pid) = self.current_process() else {
            return FaultOutcome::Fatal;
        };

        self.processes.pcb_mut(pid).faulted = true;
        match self.halt(0) {
            Ok(outcome) => {
                log::warn!("process {} terminated with status {}", pid, FAULT_EXIT_STATUS);
                FaultOutcome::Terminated(outcome)
            }
            Err(e) => {
                log::error!("could not recover from fault in process {}: {}", pid, e);
                FaultOutcome::Fatal
            }
        }
    }
}
