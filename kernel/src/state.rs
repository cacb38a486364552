//! Kernel state.
//!
//! Everything the process core mutates lives in one [`KernelState`] value:
//! translation structures, the process arena, terminals, scheduler and
//! device state. The bare-metal build keeps it in a global mutex taken
//! with interrupts masked; the host tests own one directly.
//!
//! Operations are implemented next to the subsystem they belong to
//! (`vfs`, `process::exec`, `scheduler`, `syscall`, `terminal`,
//! `interrupts`) as further `impl` blocks on this type.

use crate::config::{KernelConfig, TERMINAL_COUNT};
use crate::drivers::{KeyboardDecoder, VirtualClock};
use crate::error::{KernelError, KernelResult};
use crate::fs::FileSystem;
use crate::interrupts::Irq;
use crate::memory::AddressSpace;
use crate::platform::Platform;
use crate::process::{Context, ContextSlot, ProcessControlBlock, ProcessId, ProcessTable};
use crate::scheduler::Scheduler;
use crate::terminal::{Terminal, TerminalId};

pub struct KernelState<P: Platform, F: FileSystem> {
    pub(crate) platform: P,
    pub(crate) fs: F,
    pub(crate) config: KernelConfig,
    pub(crate) memory: AddressSpace,
    pub(crate) processes: ProcessTable,
    pub(crate) terminals: [Terminal; TERMINAL_COUNT],
    /// Terminal whose process is running.
    pub(crate) current_terminal: TerminalId,
    /// Terminal shown on the screen and receiving keyboard input.
    pub(crate) screen_terminal: TerminalId,
    pub(crate) scheduler: Scheduler,
    pub(crate) clock: VirtualClock,
    pub(crate) keyboard: KeyboardDecoder,
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    pub fn new(platform: P, fs: F, config: KernelConfig) -> Self {
        Self {
            platform,
            fs,
            config,
            memory: AddressSpace::new(),
            processes: ProcessTable::new(),
            terminals: core::array::from_fn(Terminal::new),
            current_terminal: 0,
            screen_terminal: 0,
            scheduler: Scheduler::new(),
            clock: VirtualClock::new(),
            keyboard: KeyboardDecoder::new(),
        }
    }

    /// Turn on paging and the interrupt sources.
    ///
    /// Must be called once the state has reached its final location; the
    /// page directory address is handed to the CPU here.
    pub fn boot(&mut self) {
        self.memory.initialize(&mut self.platform);

        self.platform.enable_irq(Irq::KEYBOARD);

        self.platform.arm_periodic_clock();
        self.platform.enable_irq(Irq::CASCADE);
        self.platform.enable_irq(Irq::CLOCK);

        self.platform.start_timer(self.config.timer_frequency);
        self.platform.enable_irq(Irq::TIMER);

        log::info!(
            "kernel ready: {} terminals, timer at {} Hz",
            TERMINAL_COUNT,
            self.config.timer_frequency
        );
    }

    /// Real-time clock interrupt.
    pub fn clock_interrupt(&mut self) {
        self.platform.acknowledge_clock();
        self.clock.on_interrupt();
        self.platform.acknowledge(Irq::CLOCK);
    }

    /// Process running on the current terminal.
    pub fn current_process(&self) -> Option<ProcessId> {
        self.terminals[self.current_terminal].active_process
    }

    pub(crate) fn running_pid(&self) -> KernelResult<ProcessId> {
        self.current_process().ok_or(KernelError::Unsupported)
    }

    pub fn current_terminal(&self) -> TerminalId {
        self.current_terminal
    }

    pub fn screen_terminal(&self) -> TerminalId {
        self.screen_terminal
    }

    pub fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id]
    }

    /// Control block of a live process.
    pub fn process(&self, pid: ProcessId) -> Option<&ProcessControlBlock> {
        self.processes
            .is_live(pid)
            .then(|| self.processes.pcb(pid))
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn address_space(&self) -> &AddressSpace {
        &self.memory
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Storage for a context the platform is about to save.
    ///
    /// The pointer stays valid as long as the state is not moved.
    pub fn context_ptr(&mut self, slot: ContextSlot) -> Option<*mut Context> {
        match slot {
            ContextSlot::Saved(pid) => {
                Some(&mut self.processes.pcb_mut(pid).saved_context as *mut Context)
            }
            ContextSlot::Parent(pid) => {
                Some(&mut self.processes.pcb_mut(pid).parent_context as *mut Context)
            }
            ContextSlot::Discard => None,
        }
    }
}
