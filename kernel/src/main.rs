//! trios kernel image
//!
//! Freestanding i686 binary. A multiboot loader enters `_start` with the
//! boot file system image as the first module; everything after that is
//! handled by the library.
//!
//! # Boot Process
//!
//! 1. The loader places the kernel at 4 MB and the image right after it
//! 2. `_start` switches to the boot stack and calls [`kernel_main`]
//! 3. Descriptor tables, paging and the interrupt controllers come up
//! 4. The first timer tick starts a shell on terminal 0

#![no_std]
#![no_main]
#![deny(unsafe_op_in_unsafe_fn)]

use core::panic::PanicInfo;

use trios_kernel::arch::x86::{cpu, entry};
use trios_kernel::config::{KERNEL_BASE, LARGE_PAGE_SIZE};
use trios_kernel::serial_println;

const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;
/// Page-align modules, provide memory information.
const MULTIBOOT_HEADER_FLAGS: u32 = 0x0000_0003;
const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;
const MULTIBOOT_INFO_MODULES: u32 = 1 << 3;

const BOOT_STACK_SIZE: usize = 64 * 1024;

#[repr(C)]
struct MultibootInfo {
    flags: u32,
    mem_lower: u32,
    mem_upper: u32,
    boot_device: u32,
    cmdline: u32,
    mods_count: u32,
    mods_addr: u32,
}

#[repr(C)]
struct MultibootModule {
    start: u32,
    end: u32,
    string: u32,
    reserved: u32,
}

core::arch::global_asm!(
    ".section .multiboot, \"a\"",
    ".align 4",
    ".long {magic}",
    ".long {flags}",
    ".long {checksum}",
    ".section .bss",
    ".align 16",
    "boot_stack_bottom:",
    ".skip {stack_size}",
    "boot_stack_top:",
    ".section .text",
    ".global _start",
    "_start:",
    "mov esp, offset boot_stack_top",
    "push ebx",
    "push eax",
    "call {main}",
    "2:",
    "cli",
    "hlt",
    "jmp 2b",
    magic = const MULTIBOOT_HEADER_MAGIC,
    flags = const MULTIBOOT_HEADER_FLAGS,
    checksum = const 0u32.wrapping_sub(MULTIBOOT_HEADER_MAGIC.wrapping_add(MULTIBOOT_HEADER_FLAGS)),
    stack_size = const BOOT_STACK_SIZE,
    main = sym kernel_main,
);

/// Locate the boot image and hand over to the kernel.
extern "C" fn kernel_main(magic: u32, info: *const MultibootInfo) -> ! {
    serial_println!("trios kernel starting");

    if magic != MULTIBOOT_BOOTLOADER_MAGIC {
        serial_println!("not loaded by a multiboot loader (magic {:#x})", magic);
        cpu::hlt_loop();
    }

    // SAFETY: the loader passes a valid information block in low memory,
    // which is identity-addressed while paging is still off.
    let info = unsafe { &*info };
    if info.flags & MULTIBOOT_INFO_MODULES == 0 || info.mods_count == 0 {
        serial_println!("no boot image module");
        cpu::hlt_loop();
    }
    // SAFETY: `mods_count` is at least one, so the first entry exists.
    let module = unsafe { &*(info.mods_addr as usize as *const MultibootModule) };

    let kernel_page = KERNEL_BASE..KERNEL_BASE + LARGE_PAGE_SIZE;
    if !kernel_page.contains(&module.start) || module.end > kernel_page.end || module.end < module.start {
        serial_println!(
            "boot image at {:#x}..{:#x} is outside the kernel page",
            module.start,
            module.end
        );
        cpu::hlt_loop();
    }

    // SAFETY: the module stays resident and lies in the kernel page, which
    // remains identity-mapped after paging is enabled.
    let image = unsafe {
        core::slice::from_raw_parts(
            module.start as usize as *const u8,
            (module.end - module.start) as usize,
        )
    };
    entry::boot(image)
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!();
    serial_println!("========================================");
    serial_println!("KERNEL PANIC");
    serial_println!("========================================");
    if let Some(location) = info.location() {
        serial_println!(
            "Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    serial_println!("Message: {}", info.message());
    serial_println!("System halted.");
    cpu::hlt_loop()
}
