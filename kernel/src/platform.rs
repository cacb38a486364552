//! Hardware access used by the kernel core.
//!
//! The core never touches control registers, I/O ports or raw user memory
//! directly. It goes through a [`Platform`] value instead: the bare-metal
//! build supplies `arch::x86::X86Platform`, and the host test suite a mock
//! that records what the core asked for.

use crate::error::KernelResult;
use crate::interrupts::InterruptController;
use crate::memory::paging::AddressSpace;
use crate::terminal::Cursor;

/// Privileged operations the core delegates.
pub trait Platform: InterruptController {
    // ---- Address translation ----

    /// Physical address of a kernel object whose virtual address is `virt`.
    fn physical_address(&self, virt: usize) -> u32;

    /// Load the directory at `directory` and turn on paging with large pages.
    fn enable_paging(&mut self, directory: u32);

    /// Set or clear the paging-enable bit without touching the directory.
    fn set_paging(&mut self, enabled: bool);

    /// Invalidate all non-global translations.
    fn flush_tlb(&mut self);

    // ---- Privilege transitions ----

    /// Stack the CPU switches to on the next ring 3 to ring 0 transition.
    fn set_kernel_stack(&mut self, stack_top: u32);

    // ---- Memory ----

    /// Copy `bytes` to the user virtual address `address` as mapped by `space`.
    fn copy_to_user(&mut self, space: &AddressSpace, address: u32, bytes: &[u8]) -> KernelResult<()>;

    /// Copy one 4 KB page of video memory between two kernel-visible addresses.
    fn copy_video_page(&mut self, space: &AddressSpace, dst: u32, src: u32);

    // ---- Console ----
    //
    // All console operations draw through the video page at 0xB8000 as
    // currently mapped by `space`.

    /// Render one byte and advance `cursor`.
    fn put_char(&mut self, space: &AddressSpace, cursor: &mut Cursor, byte: u8);

    /// Remove the character left of `cursor`.
    fn erase_char(&mut self, space: &AddressSpace, cursor: &mut Cursor);

    /// Blank the screen and home `cursor`.
    fn clear_screen(&mut self, space: &AddressSpace, cursor: &mut Cursor);

    /// Move the hardware cursor.
    fn show_cursor(&mut self, cursor: &Cursor);

    // ---- Devices ----

    /// Program the interval timer to fire at `frequency` Hz.
    fn start_timer(&mut self, frequency: u32);

    /// Put the real-time clock into periodic interrupt mode.
    fn arm_periodic_clock(&mut self);

    /// Acknowledge the clock device so it raises the next interrupt.
    fn acknowledge_clock(&mut self);

    /// Wait for the next interrupt.
    fn idle(&mut self);
}
