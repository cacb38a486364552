//! Round-robin terminal scheduler.
//!
//! The timer rotates through the terminals and runs each one's active
//! process. The first pass starts a shell on every terminal; after that a
//! tick is a plain context switch.

use crate::config::{kernel_stack_top, TERMINAL_COUNT};
use crate::error::KernelResult;
use crate::fs::FileSystem;
use crate::interrupts::Irq;
use crate::platform::Platform;
use crate::process::{ContextSlot, ProcessId, UserEntry};
use crate::state::KernelState;
use crate::terminal::TerminalId;

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// `n` terminals have their first shell.
    Bootstrap(usize),
    SteadyState,
}

/// What the next tick should do with a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Start the terminal's first shell.
    Spawn(TerminalId),
    /// Resume the terminal's active process.
    Switch(TerminalId),
}

pub struct Scheduler {
    state: SchedulerState,
    next: TerminalId,
    ticks: u64,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            state: SchedulerState::Bootstrap(0),
            next: 0,
            ticks: 0,
        }
    }

    /// The step the next tick takes. Does not advance.
    pub fn peek(&self) -> Step {
        match self.state {
            SchedulerState::Bootstrap(_) => Step::Spawn(self.next),
            SchedulerState::SteadyState => Step::Switch(self.next),
        }
    }

    /// Advance past the step returned by [`peek`](Self::peek).
    pub fn commit(&mut self) {
        self.next = (self.next + 1) % TERMINAL_COUNT;
        self.ticks += 1;
        if let SchedulerState::Bootstrap(started) = self.state {
            self.state = if started + 1 >= TERMINAL_COUNT {
                SchedulerState::SteadyState
            } else {
                SchedulerState::Bootstrap(started + 1)
            };
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Ticks that switched or started a process.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// What the platform does at the end of a timer interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Save into `save` and enter a new process.
    Enter { entry: UserEntry, save: ContextSlot },
    /// Save into `save` and restore `resume`'s saved context.
    Switch { save: ContextSlot, resume: ProcessId },
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    /// Timer interrupt: pick the next terminal and prepare the switch.
    ///
    /// A failed bootstrap spawn leaves the scheduler where it was.
    pub fn timer_tick(&mut self) -> KernelResult<TickAction> {
        self.platform.acknowledge(Irq::TIMER);

        let outgoing = self.current_process();
        let save = outgoing.map_or(ContextSlot::Discard, ContextSlot::Saved);

        let terminal = match self.scheduler.peek() {
            Step::Spawn(terminal) | Step::Switch(terminal) => terminal,
        };
        let previous = self.current_terminal;
        self.current_terminal = terminal;

        match self.terminals[terminal].active_process {
            Some(incoming) if matches!(self.scheduler.peek(), Step::Switch(_)) => {
                self.scheduler.commit();
                self.context_switch(incoming);
                log::trace!(
                    "tick {}: terminal {} resumes pid {}",
                    self.scheduler.ticks(),
                    terminal,
                    incoming
                );
                Ok(TickAction::Switch {
                    save,
                    resume: incoming,
                })
            }
            _ => {
                let shell = self.config.shell;
                match self.spawn(shell, true) {
                    Ok(entry) => {
                        self.scheduler.commit();
                        Ok(TickAction::Enter { entry, save })
                    }
                    Err(e) => {
                        log::error!("cannot start shell on terminal {}: {}", terminal, e);
                        self.current_terminal = previous;
                        if let Some(outgoing) = outgoing {
                            self.context_switch(outgoing);
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    /// Make `pid` addressable and give it its kernel stack.
    pub fn context_switch(&mut self, pid: ProcessId) {
        self.memory.map_process_window(&mut self.platform, pid.0);
        self.platform.set_kernel_stack(kernel_stack_top(pid.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_then_steady_state() {
        let mut scheduler = Scheduler::new();
        for terminal in 0..TERMINAL_COUNT {
            assert_eq!(scheduler.peek(), Step::Spawn(terminal));
            scheduler.commit();
        }
        assert_eq!(scheduler.state(), SchedulerState::SteadyState);
        assert_eq!(scheduler.peek(), Step::Switch(0));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.peek(), scheduler.peek());
        assert_eq!(scheduler.ticks(), 0);
    }

    #[test]
    fn test_round_robin_order() {
        let mut scheduler = Scheduler::new();
        for _ in 0..TERMINAL_COUNT {
            scheduler.commit();
        }
        let order: Vec<_> = (0..6)
            .map(|_| {
                let step = scheduler.peek();
                scheduler.commit();
                step
            })
            .collect();
        assert_eq!(
            order,
            vec![
                Step::Switch(0),
                Step::Switch(1),
                Step::Switch(2),
                Step::Switch(0),
                Step::Switch(1),
                Step::Switch(2),
            ]
        );
    }
}
