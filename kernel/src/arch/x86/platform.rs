//! [`Platform`] on real hardware.

use super::pic::ChainedPics;
use super::{cpu, devices, gdt, vga};
use crate::config::{PAGE_SIZE, USER_WINDOW_BASE, USER_WINDOW_END};
use crate::error::{KernelError, KernelResult};
use crate::interrupts::{InterruptController, Irq};
use crate::memory::AddressSpace;
use crate::platform::Platform;
use crate::terminal::Cursor;

pub struct X86Platform {
    pics: ChainedPics,
}

impl X86Platform {
    /// # Safety
    ///
    /// Call once during boot with interrupts disabled, after the GDT is loaded.
    pub unsafe fn new() -> Self {
        Self {
            // SAFETY: guaranteed by the caller.
            pics: unsafe { ChainedPics::initialize() },
        }
    }
}

impl InterruptController for X86Platform {
    fn enable_irq(&mut self, irq: Irq) {
        self.pics.enable_irq(irq);
    }

    fn disable_irq(&mut self, irq: Irq) {
        self.pics.disable_irq(irq);
    }

    fn acknowledge(&mut self, irq: Irq) {
        self.pics.acknowledge(irq);
    }
}

impl Platform for X86Platform {
    fn physical_address(&self, virt: usize) -> u32 {
        // The kernel image is identity-mapped.
        virt as u32
    }

    fn enable_paging(&mut self, directory: u32) {
        // SAFETY: the directory identity-maps the kernel page.
        unsafe { cpu::enable_paging(directory) };
    }

    fn set_paging(&mut self, enabled: bool) {
        // SAFETY: the kernel is identity-mapped.
        unsafe { cpu::set_paging(enabled) };
    }

    fn flush_tlb(&mut self) {
        cpu::flush_tlb();
    }

    fn set_kernel_stack(&mut self, stack_top: u32) {
        gdt::set_kernel_stack(stack_top);
    }

    fn copy_to_user(&mut self, space: &AddressSpace, address: u32, bytes: &[u8]) -> KernelResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let last = address
            .checked_add(bytes.len() as u32 - 1)
            .ok_or(KernelError::BadAddress)?;
        let window = USER_WINDOW_BASE..USER_WINDOW_END;
        if !window.contains(&address) || !window.contains(&last) || !space.is_user_accessible(address) {
            return Err(KernelError::BadAddress);
        }
        // SAFETY: the range lies inside the user window, which is one
        // present 4 MB page of the active directory.
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), address as usize as *mut u8, bytes.len());
        }
        Ok(())
    }

    fn copy_video_page(&mut self, _space: &AddressSpace, dst: u32, src: u32) {
        // SAFETY: the caller mapped both pages before asking for the copy.
        unsafe {
            core::ptr::copy_nonoverlapping(
                src as usize as *const u8,
                dst as usize as *mut u8,
                PAGE_SIZE as usize,
            );
        }
    }

    fn put_char(&mut self, _space: &AddressSpace, cursor: &mut Cursor, byte: u8) {
        vga::put_char(cursor, byte);
    }

    fn erase_char(&mut self, _space: &AddressSpace, cursor: &mut Cursor) {
        vga::erase_char(cursor);
    }

    fn clear_screen(&mut self, _space: &AddressSpace, cursor: &mut Cursor) {
        vga::clear(cursor);
    }

    fn show_cursor(&mut self, cursor: &Cursor) {
        vga::show_cursor(cursor);
    }

    fn start_timer(&mut self, frequency: u32) {
        devices::start_timer(frequency);
    }

    fn arm_periodic_clock(&mut self) {
        devices::arm_periodic_clock();
    }

    fn acknowledge_clock(&mut self) {
        devices::acknowledge_clock();
    }

    fn idle(&mut self) {
        cpu::wait_for_interrupt();
    }
}
