//! Process slot table.
//!
//! Fixed arena of control blocks indexed by pid, plus the in-use flags.
//! A freed slot keeps its stale contents until the next `execute` reuses it.

use super::pcb::ProcessControlBlock;
use super::ProcessId;
use crate::config::MAX_PROCESSES;
use crate::error::{KernelError, KernelResult};

pub struct ProcessTable {
    live: [bool; MAX_PROCESSES],
    blocks: [ProcessControlBlock; MAX_PROCESSES],
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            live: [false; MAX_PROCESSES],
            blocks: core::array::from_fn(|i| ProcessControlBlock::new(ProcessId(i))),
        }
    }

    /// Claim the lowest free pid.
    pub fn allocate(&mut self) -> KernelResult<ProcessId> {
        let index = self
            .live
            .iter()
            .position(|&live| !live)
            .ok_or(KernelError::NoFreeProcessSlot)?;
        self.live[index] = true;
        Ok(ProcessId(index))
    }

    /// Mark `pid` free. The control block is left as is.
    pub fn release(&mut self, pid: ProcessId) {
        if let Some(live) = self.live.get_mut(pid.0) {
            *live = false;
        }
    }

    pub fn is_live(&self, pid: ProcessId) -> bool {
        self.live.get(pid.0).copied().unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|&&live| live).count()
    }

    pub fn pcb(&self, pid: ProcessId) -> &ProcessControlBlock {
        &self.blocks[pid.0]
    }

    pub fn pcb_mut(&mut self, pid: ProcessId) -> &mut ProcessControlBlock {
        &mut self.blocks[pid.0]
    }

    /// Live pids in ascending order.
    #[cfg(test)]
    pub fn live_pids(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, &live)| live)
            .map(|(i, _)| ProcessId(i))
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
