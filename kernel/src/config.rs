//! Kernel configuration constants.
//!
//! This module contains compile-time configuration for the kernel.
//! Values here fix the memory layout, the process and descriptor limits,
//! and the rates of the timer and clock devices.

use log::LevelFilter;

/// Maximum number of concurrently live processes.
pub const MAX_PROCESSES: usize = 6;

/// Descriptors per process.
pub const FILE_NUM: usize = 8;

/// Descriptors below this index are bound to stdin/stdout.
pub const FIRST_ALLOCATABLE_FD: usize = 2;

/// Number of terminals multiplexed onto the one screen.
pub const TERMINAL_COUNT: usize = 3;

/// Size of each keyboard line buffer.
pub const LINE_BUFFER_SIZE: usize = 128;

/// Longest accepted command line (without the terminating NUL).
pub const MAX_COMMAND_LENGTH: usize = 128;

/// Size of the per-process argument buffer.
pub const ARGUMENT_BUFFER_SIZE: usize = 128;

/// Longest file name stored in a directory entry.
pub const MAX_FILE_NAME: usize = 32;

/// Page size (4 KB).
pub const PAGE_SIZE: u32 = 4 * 1024;

/// Large page size (4 MB).
pub const LARGE_PAGE_SIZE: u32 = 4 * 1024 * 1024;

/// Physical (and identity-mapped) base of the kernel image.
pub const KERNEL_BASE: u32 = 0x0040_0000;

/// Top of the per-process kernel stack region; also the first process frame.
pub const KERNEL_STACK_REGION_TOP: u32 = 0x0080_0000;

/// Physical base of the first process frame (8 MB).
pub const PROCESS_FRAME_BASE: u32 = 0x0080_0000;

/// Kernel stack reserved per pid (8 KB).
pub const KERNEL_STACK_SIZE: u32 = 8 * 1024;

/// Virtual base of the user window (128 MB).
pub const USER_WINDOW_BASE: u32 = 0x0800_0000;

/// First address past the user window (132 MB).
pub const USER_WINDOW_END: u32 = USER_WINDOW_BASE + LARGE_PAGE_SIZE;

/// Where executables are loaded inside the user window.
pub const PROGRAM_IMAGE_ADDR: u32 = 0x0804_8000;

/// Largest number of image bytes copied into the user window.
pub const MAX_IMAGE_SIZE: usize = (LARGE_PAGE_SIZE - 0x48000) as usize;

/// Initial user stack pointer.
pub const USER_STACK_TOP: u32 = USER_WINDOW_END - 4;

/// Base of the per-terminal memory-mapped video windows (132 MB).
pub const VIDMAP_BASE: u32 = USER_WINDOW_END;

/// Physical address of live VGA text memory.
pub const VIDEO_MEMORY: u32 = 0x000B_8000;

/// Off-screen backing pages, one per terminal.
pub const VIDEO_BACKING: [u32; TERMINAL_COUNT] = [0x000B_9000, 0x000B_A000, 0x000B_B000];

/// Leading bytes of every executable image.
pub const EXECUTABLE_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Offset of the little-endian entry point within an image.
pub const ENTRY_POINT_OFFSET: u32 = 24;

/// Exit status reported for a process killed by a CPU exception.
pub const FAULT_EXIT_STATUS: i32 = 256;

/// User code segment selector (GDT index 4, RPL 3).
pub const USER_CS: u32 = 0x23;

/// User data/stack segment selector (GDT index 5, RPL 3).
pub const USER_DS: u32 = 0x2B;

/// EFLAGS for a fresh user thread: IF plus the always-one bit.
pub const USER_EFLAGS: u32 = 0x0202;

/// Timer interrupt frequency in Hz.
pub const TIMER_FREQUENCY: u32 = 50;

/// Input clock of the programmable interval timer.
pub const PIT_BASE_FREQUENCY: u32 = 1_193_180;

/// Rate the real-time clock hardware runs at.
pub const RTC_BASE_FREQUENCY: u32 = 1024;

/// Virtual clock rate a terminal gets when the clock is opened.
pub const RTC_DEFAULT_FREQUENCY: u32 = 2;

/// Serial port for debug output (COM1).
pub const DEBUG_SERIAL_PORT: u16 = 0x3F8;

/// Enable kernel debugging features based on build profile.
pub const DEBUG_ENABLED: bool = cfg!(debug_assertions);

/// Command that is started on every terminal.
pub const SHELL_COMMAND: &[u8] = b"shell";

/// Runtime knobs handed to [`crate::state::KernelState::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Command line used for terminal-root shells.
    pub shell: &'static [u8],
    /// Timer interrupt frequency in Hz.
    pub timer_frequency: u32,
    /// Maximum level forwarded to the log sink.
    pub log_level: LevelFilter,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            shell: SHELL_COMMAND,
            timer_frequency: TIMER_FREQUENCY,
            log_level: if DEBUG_ENABLED {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        }
    }
}

/// Top of the kernel stack reserved for `pid`.
pub const fn kernel_stack_top(pid: usize) -> u32 {
    KERNEL_STACK_REGION_TOP - pid as u32 * KERNEL_STACK_SIZE
}

/// Documented address of the control block at the bottom of `pid`'s kernel stack.
pub const fn pcb_address(pid: usize) -> u32 {
    KERNEL_STACK_REGION_TOP - (pid as u32 + 1) * KERNEL_STACK_SIZE
}

/// Physical 4 MB frame backing `pid`'s user window.
pub const fn process_frame(pid: usize) -> u32 {
    PROCESS_FRAME_BASE + pid as u32 * LARGE_PAGE_SIZE
}

/// Virtual address of the memory-mapped video window for `terminal`.
pub const fn vidmap_address(terminal: usize) -> u32 {
    VIDMAP_BASE + terminal as u32 * PAGE_SIZE
}
