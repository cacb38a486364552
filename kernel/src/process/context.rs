//! Process Context
//!
//! Saved CPU state for kernel-side switches and the frame used to drop
//! into user mode.

use super::ProcessId;
use crate::config::{USER_CS, USER_DS, USER_EFLAGS, USER_STACK_TOP};

/// Callee-saved register context.
///
/// Captured when a kernel path suspends (preemption, or a parent waiting in
/// `execute`) and restored to resume it. The field order is relied on by
/// the switch routines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Context {
    /// EBX register
    pub ebx: u32,
    /// ESI register
    pub esi: u32,
    /// EDI register
    pub edi: u32,
    /// EBP register (frame pointer)
    pub ebp: u32,
    /// Stack pointer to resume on
    pub esp: u32,
    /// Instruction pointer to resume at
    pub eip: u32,
}

impl Context {
    pub const fn new() -> Self {
        Self {
            ebx: 0,
            esi: 0,
            edi: 0,
            ebp: 0,
            esp: 0,
            eip: 0,
        }
    }

    /// Whether anything has been saved into this context.
    #[cfg(test)]
    pub fn is_saved(&self) -> bool {
        self.eip != 0
    }
}

/// Privilege-transition frame, in the order `iret` pops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct UserFrame {
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub esp: u32,
    pub ss: u32,
}

impl UserFrame {
    /// Frame entering ring 3 at `entry` on a fresh user stack with interrupts on.
    pub const fn new(entry: u32) -> Self {
        Self {
            eip: entry,
            cs: USER_CS,
            eflags: USER_EFLAGS,
            esp: USER_STACK_TOP,
            ss: USER_DS,
        }
    }
}

/// A process ready to enter user mode for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEntry {
    pub pid: ProcessId,
    pub frame: UserFrame,
}

/// Where the platform saves the context it is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSlot {
    /// The process's own slot, restored when it is scheduled again.
    Saved(ProcessId),
    /// The slot the child restores on halt.
    Parent(ProcessId),
    /// The outgoing context is never resumed.
    Discard,
}
