//! Process control block.

use super::context::Context;
use super::ProcessId;
use crate::config::ARGUMENT_BUFFER_SIZE;
use crate::terminal::TerminalId;
use crate::vfs::fd::DescriptorTable;

/// Argument string handed to a process at `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arguments {
    bytes: [u8; ARGUMENT_BUFFER_SIZE],
    len: usize,
}

impl Arguments {
    pub const fn new() -> Self {
        Self {
            bytes: [0; ARGUMENT_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Replace the contents, truncating to the buffer size.
    pub fn set(&mut self, args: &[u8]) {
        let len = args.len().min(ARGUMENT_BUFFER_SIZE);
        self.bytes = [0; ARGUMENT_BUFFER_SIZE];
        self.bytes[..len].copy_from_slice(&args[..len]);
        self.len = len;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-process state.
#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pub pid: ProcessId,
    /// Self for terminal roots.
    pub parent: ProcessId,
    pub terminal: TerminalId,
    /// Restored when the scheduler picks this process again.
    pub saved_context: Context,
    /// Restored, in the parent, when this process halts.
    pub parent_context: Context,
    pub arguments: Arguments,
    pub descriptors: DescriptorTable,
    /// Set by the exception path; the halt status becomes 256.
    pub faulted: bool,
    /// Shell owning a terminal; respawned instead of returning to a parent.
    pub terminal_root: bool,
}

impl ProcessControlBlock {
    pub const fn new(pid: ProcessId) -> Self {
        Self {
            pid,
            parent: pid,
            terminal: 0,
            saved_context: Context::new(),
            parent_context: Context::new(),
            arguments: Arguments::new(),
            descriptors: DescriptorTable::new(),
            faulted: false,
            terminal_root: false,
        }
    }

    /// Reinitialise the block for a freshly executed program.
    pub fn reset(&mut self, parent: ProcessId, terminal: TerminalId, arguments: &[u8], root: bool) {
        self.parent = parent;
        self.terminal = terminal;
        self.saved_context = Context::new();
        self.parent_context = Context::new();
        self.arguments.set(arguments);
        self.descriptors.reset();
        self.faulted = false;
        self.terminal_root = root;
    }
}
