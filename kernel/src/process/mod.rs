//! Process management.
//!
//! A process is one program image in one 4 MB frame, one kernel stack,
//! and one control block. There is no heap and no process can outlive the
//! fixed slot table.
//!
//! # Components
//!
//! - **context**: saved register state and the user-mode entry frame
//! - **pcb**: the per-process control block
//! - **table**: slot allocation
//! - **exec**: the execute/halt protocol

pub mod context;
pub mod exec;
pub mod pcb;
pub mod table;

use core::fmt;

pub use context::{Context, ContextSlot, UserEntry, UserFrame};
pub use exec::{CommandLine, HaltOutcome};
pub use pcb::ProcessControlBlock;
pub use table::ProcessTable;

/// Process ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub usize);

impl ProcessId {
    /// Get the raw ID value
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_comparison() {
        let pid1 = ProcessId(1);
        let pid2 = ProcessId(2);
        assert_ne!(pid1, pid2);
        assert!(pid1 < pid2);
        assert_eq!(pid2.as_usize(), 2);
    }
}
