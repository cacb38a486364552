//! Control registers and interrupt flag.

use core::arch::asm;

const CR0_PROTECTED_MODE: u32 = 1 << 0;
const CR0_PAGING: u32 = 1 << 31;
const CR4_PAGE_SIZE_EXTENSION: u32 = 1 << 4;
const CR4_GLOBAL_PAGES: u32 = 1 << 7;
const EFLAGS_INTERRUPT: u32 = 1 << 9;

#[inline]
pub fn read_cr0() -> u32 {
    let value: u32;
    // SAFETY: reading CR0 has no side effects.
    unsafe { asm!("mov {}, cr0", out(reg) value, options(nomem, nostack, preserves_flags)) };
    value
}

/// # Safety
///
/// The new value must keep the kernel's own code mapped.
#[inline]
pub unsafe fn write_cr0(value: u32) {
    // SAFETY: guaranteed by the caller.
    unsafe { asm!("mov cr0, {}", in(reg) value, options(nostack, preserves_flags)) };
}

/// Faulting address of the last page fault.
#[inline]
pub fn read_cr2() -> u32 {
    let value: u32;
    // SAFETY: reading CR2 has no side effects.
    unsafe { asm!("mov {}, cr2", out(reg) value, options(nomem, nostack, preserves_flags)) };
    value
}

#[inline]
pub fn read_cr3() -> u32 {
    let value: u32;
    // SAFETY: reading CR3 has no side effects.
    unsafe { asm!("mov {}, cr3", out(reg) value, options(nomem, nostack, preserves_flags)) };
    value
}

/// # Safety
///
/// `directory` must be the physical address of a valid page directory.
#[inline]
pub unsafe fn write_cr3(directory: u32) {
    // SAFETY: guaranteed by the caller.
    unsafe { asm!("mov cr3, {}", in(reg) directory, options(nostack, preserves_flags)) };
}

#[inline]
fn read_cr4() -> u32 {
    let value: u32;
    // SAFETY: reading CR4 has no side effects.
    unsafe { asm!("mov {}, cr4", out(reg) value, options(nomem, nostack, preserves_flags)) };
    value
}

#[inline]
unsafe fn write_cr4(value: u32) {
    // SAFETY: guaranteed by the caller.
    unsafe { asm!("mov cr4, {}", in(reg) value, options(nostack, preserves_flags)) };
}

/// Load `directory` and turn on paging with 4 MB pages.
///
/// # Safety
///
/// The directory must identity-map the code that is executing.
pub unsafe fn enable_paging(directory: u32) {
    // SAFETY: guaranteed by the caller.
    unsafe {
        write_cr3(directory);
        write_cr4(read_cr4() | CR4_PAGE_SIZE_EXTENSION | CR4_GLOBAL_PAGES);
        write_cr0(read_cr0() | CR0_PAGING | CR0_PROTECTED_MODE);
    }
}

/// Set or clear CR0.PG.
///
/// # Safety
///
/// The kernel must be identity-mapped so execution continues either way.
pub unsafe fn set_paging(enabled: bool) {
    let cr0 = read_cr0();
    let cr0 = if enabled { cr0 | CR0_PAGING } else { cr0 & !CR0_PAGING };
    // SAFETY: guaranteed by the caller.
    unsafe { write_cr0(cr0) };
}

/// Drop all non-global TLB entries.
#[inline]
pub fn flush_tlb() {
    // SAFETY: reloading CR3 with its own value keeps the same translation.
    unsafe { write_cr3(read_cr3()) };
}

#[inline]
pub fn enable_interrupts() {
    // SAFETY: handlers are installed before the first call.
    unsafe { asm!("sti", options(nomem, nostack)) };
}

#[inline]
pub fn disable_interrupts() {
    // SAFETY: masking interrupts is always sound.
    unsafe { asm!("cli", options(nomem, nostack)) };
}

#[inline]
pub fn interrupts_enabled() -> bool {
    let flags: u32;
    // SAFETY: reads EFLAGS through the stack.
    unsafe { asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags)) };
    flags & EFLAGS_INTERRUPT != 0
}

/// Run `f` with interrupts masked, restoring the previous state afterwards.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let enabled = interrupts_enabled();
    if enabled {
        disable_interrupts();
    }
    let result = f();
    if enabled {
        enable_interrupts();
    }
    result
}

/// Enable interrupts, sleep until one arrives, then mask them again.
#[inline]
pub fn wait_for_interrupt() {
    // SAFETY: `sti; hlt` is atomic with respect to interrupt delivery.
    unsafe { asm!("sti", "hlt", "cli", options(nomem, nostack)) };
}

/// Stop the machine.
pub fn hlt_loop() -> ! {
    loop {
        disable_interrupts();
        // SAFETY: halting with interrupts masked only stops this CPU.
        unsafe { asm!("hlt", options(nomem, nostack)) };
    }
}
