//! Interrupt descriptor table and entry stubs.
//!
//! Every gate is an interrupt gate, so the kernel always runs with
//! interrupts masked except while it deliberately waits. The stubs save the
//! general registers with `pushad` and call into [`super::entry`].

use core::arch::{asm, naked_asm};
use core::mem::size_of;
use core::ptr::{addr_of, addr_of_mut};

use super::entry;
use super::gdt::KERNEL_CS;
use crate::interrupts::{vectors, Irq};

const IDT_ENTRIES: usize = 256;

/// Present, DPL 0, 32-bit interrupt gate.
const GATE_KERNEL: u8 = 0x8E;
/// Present, DPL 3, 32-bit interrupt gate.
const GATE_USER: u8 = 0xEE;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn new(handler: unsafe extern "C" fn(), type_attr: u8) -> Self {
        let offset = handler as usize as u32;
        Self {
            offset_low: (offset & 0xFFFF) as u16,
            selector: KERNEL_CS,
            zero: 0,
            type_attr,
            offset_high: (offset >> 16) as u16,
        }
    }
}

#[repr(C, packed)]
struct DescriptorPointer {
    limit: u16,
    base: u32,
}

static mut IDT: [IdtEntry; IDT_ENTRIES] = [IdtEntry::missing(); IDT_ENTRIES];

/// Registers as laid out by the exception stubs.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TrapFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub kernel_esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

impl TrapFrame {
    pub fn from_user(&self) -> bool {
        self.cs & 3 == 3
    }
}

// ========================================
// Stubs
// ========================================

#[unsafe(naked)]
unsafe extern "C" fn exception_common() {
    naked_asm!(
        "pushad",
        "cld",
        "push esp",
        "call {handler}",
        "add esp, 4",
        "popad",
        "add esp, 8",
        "iretd",
        handler = sym entry::exception_entry,
    );
}

macro_rules! exception_stub {
    ($name:ident, $vector:literal) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "push 0",
                "push {vector}",
                "jmp {common}",
                vector = const $vector,
                common = sym exception_common,
            );
        }
    };
    ($name:ident, $vector:literal, error_code) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "push {vector}",
                "jmp {common}",
                vector = const $vector,
                common = sym exception_common,
            );
        }
    };
}

exception_stub!(divide_error, 0);
exception_stub!(debug, 1);
exception_stub!(non_maskable, 2);
exception_stub!(breakpoint, 3);
exception_stub!(overflow, 4);
exception_stub!(bound_range, 5);
exception_stub!(invalid_opcode, 6);
exception_stub!(device_not_available, 7);
exception_stub!(double_fault, 8, error_code);
exception_stub!(segment_overrun, 9);
exception_stub!(invalid_tss, 10, error_code);
exception_stub!(segment_not_present, 11, error_code);
exception_stub!(stack_segment, 12, error_code);
exception_stub!(general_protection, 13, error_code);
exception_stub!(page_fault, 14, error_code);
exception_stub!(reserved, 15);
exception_stub!(floating_point, 16);
exception_stub!(alignment_check, 17, error_code);
exception_stub!(machine_check, 18);
exception_stub!(simd_floating_point, 19);

macro_rules! irq_stub {
    ($name:ident, $handler:path) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!(
                "pushad",
                "cld",
                "call {handler}",
                "popad",
                "iretd",
                handler = sym $handler,
            );
        }
    };
}

irq_stub!(timer_stub, entry::timer_entry);
irq_stub!(keyboard_stub, entry::keyboard_entry);
irq_stub!(clock_stub, entry::clock_entry);

/// `int 0x80`: EAX number, EBX/ECX/EDX arguments, result in EAX.
#[unsafe(naked)]
unsafe extern "C" fn syscall_stub() {
    naked_asm!(
        "pushad",
        "cld",
        "push edx",
        "push ecx",
        "push ebx",
        "push eax",
        "call {handler}",
        "add esp, 16",
        "mov [esp + 28], eax",
        "popad",
        "iretd",
        handler = sym entry::syscall_entry,
    );
}

// ========================================
// Installation
// ========================================

/// Fill and load the IDT.
///
/// # Safety
///
/// Must run once, with interrupts disabled, after the GDT is loaded.
pub unsafe fn init() {
    let exceptions: [unsafe extern "C" fn(); 20] = [
        divide_error,
        debug,
        non_maskable,
        breakpoint,
        overflow,
        bound_range,
        invalid_opcode,
        device_not_available,
        double_fault,
        segment_overrun,
        invalid_tss,
        segment_not_present,
        stack_segment,
        general_protection,
        page_fault,
        reserved,
        floating_point,
        alignment_check,
        machine_check,
        simd_floating_point,
    ];

    // SAFETY: single-threaded early boot; the CPU does not read the table
    // until `lidt` below.
    unsafe {
        let idt = &mut *addr_of_mut!(IDT);
        for (vector, stub) in exceptions.into_iter().enumerate() {
            idt[vector] = IdtEntry::new(stub, GATE_KERNEL);
        }
        idt[(vectors::PIC1_OFFSET + Irq::TIMER.0) as usize] = IdtEntry::new(timer_stub, GATE_KERNEL);
        idt[(vectors::PIC1_OFFSET + Irq::KEYBOARD.0) as usize] =
            IdtEntry::new(keyboard_stub, GATE_KERNEL);
        idt[(vectors::PIC2_OFFSET + Irq::CLOCK.0 - 8) as usize] =
            IdtEntry::new(clock_stub, GATE_KERNEL);
        idt[vectors::SYSCALL as usize] = IdtEntry::new(syscall_stub, GATE_USER);

        let pointer = DescriptorPointer {
            limit: (size_of::<[IdtEntry; IDT_ENTRIES]>() - 1) as u16,
            base: addr_of!(IDT) as u32,
        };
        asm!("lidt [{}]", in(reg) &pointer, options(readonly, nostack, preserves_flags));
    }
}
