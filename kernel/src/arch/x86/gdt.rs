//! Global descriptor table and task state segment.
//!
//! Flat 4 GB segments for both privilege levels. The selectors are fixed:
//!
//! | Selector | Segment            |
//! |----------|--------------------|
//! | 0x10     | kernel code        |
//! | 0x18     | kernel data        |
//! | 0x23     | user code (RPL 3)  |
//! | 0x2B     | user data (RPL 3)  |
//! | 0x30     | TSS                |
//!
//! The TSS only supplies `ss0:esp0`, the stack the CPU loads when an
//! interrupt arrives in ring 3.

use core::arch::asm;
use core::mem::size_of;
use core::ptr::{addr_of, addr_of_mut};

use crate::config::{USER_CS, USER_DS};

pub const KERNEL_CS: u16 = 0x10;
pub const KERNEL_DS: u16 = 0x18;
pub const TSS_SELECTOR: u16 = 0x30;

const GDT_ENTRIES: usize = 7;

const ACCESS_KERNEL_CODE: u8 = 0x9A;
const ACCESS_KERNEL_DATA: u8 = 0x92;
const ACCESS_USER_CODE: u8 = 0xFA;
const ACCESS_USER_DATA: u8 = 0xF2;
const ACCESS_TSS: u8 = 0x89;
/// 4 KB granularity, 32-bit operands.
const FLAGS_FLAT: u8 = 0xC;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    flags_limit_high: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn null() -> Self {
        Self::new(0, 0, 0, 0)
    }

    const fn new(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        Self {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access,
            flags_limit_high: ((limit >> 16) & 0x0F) as u8 | (flags << 4),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }
}

#[repr(C, packed)]
struct DescriptorPointer {
    limit: u16,
    base: u32,
}

/// i386 task state segment.
#[repr(C, packed)]
pub struct TaskStateSegment {
    link: u32,
    esp0: u32,
    ss0: u32,
    unused: [u32; 22],
    trap: u16,
    iomap_base: u16,
}

const _: () = assert!(size_of::<TaskStateSegment>() == 104);

static mut TSS: TaskStateSegment = TaskStateSegment {
    link: 0,
    esp0: 0,
    ss0: KERNEL_DS as u32,
    unused: [0; 22],
    trap: 0,
    iomap_base: size_of::<TaskStateSegment>() as u16,
};

static mut GDT: [GdtEntry; GDT_ENTRIES] = [
    GdtEntry::null(),
    GdtEntry::null(),
    GdtEntry::new(0, 0xFFFFF, ACCESS_KERNEL_CODE, FLAGS_FLAT),
    GdtEntry::new(0, 0xFFFFF, ACCESS_KERNEL_DATA, FLAGS_FLAT),
    GdtEntry::new(0, 0xFFFFF, ACCESS_USER_CODE, FLAGS_FLAT),
    GdtEntry::new(0, 0xFFFFF, ACCESS_USER_DATA, FLAGS_FLAT),
    GdtEntry::null(),
];

const _: () = assert!(USER_CS as usize == 4 * 8 + 3 && USER_DS as usize == 5 * 8 + 3);

/// Load the GDT and TSS and reload every segment register.
///
/// # Safety
///
/// Must run once, with interrupts disabled, before any ring transition.
pub unsafe fn init(initial_stack: u32) {
    // SAFETY: single-threaded early boot; nothing else references the tables.
    unsafe {
        let tss = addr_of_mut!(TSS);
        (*tss).esp0 = initial_stack;

        let gdt = addr_of_mut!(GDT);
        (*gdt)[(TSS_SELECTOR / 8) as usize] = GdtEntry::new(
            tss as u32,
            size_of::<TaskStateSegment>() as u32 - 1,
            ACCESS_TSS,
            0,
        );

        let pointer = DescriptorPointer {
            limit: (size_of::<[GdtEntry; GDT_ENTRIES]>() - 1) as u16,
            base: addr_of!(GDT) as u32,
        };
        asm!("lgdt [{}]", in(reg) &pointer, options(readonly, nostack, preserves_flags));

        asm!(
            "push {cs}",
            "lea {tmp}, [2f]",
            "push {tmp}",
            "retf",
            "2:",
            "mov ds, {ds:x}",
            "mov es, {ds:x}",
            "mov fs, {ds:x}",
            "mov gs, {ds:x}",
            "mov ss, {ds:x}",
            cs = const KERNEL_CS as u32,
            ds = in(reg) KERNEL_DS as u32,
            tmp = out(reg) _,
        );

        asm!("ltr {0:x}", in(reg) TSS_SELECTOR as u32, options(nostack, preserves_flags));
    }
}

/// Stack used for the next ring 3 to ring 0 transition.
pub fn set_kernel_stack(stack_top: u32) {
    // SAFETY: a single aligned store; the CPU only reads esp0 on a ring
    // transition, which cannot happen while the kernel is running.
    unsafe { (*addr_of_mut!(TSS)).esp0 = stack_top };
}
