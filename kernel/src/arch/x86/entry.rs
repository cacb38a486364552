//! Interrupt and system call entry points.
//!
//! The kernel state lives in one global mutex. Interrupt gates mask
//! interrupts, so a handler never finds the lock held by the code it
//! interrupted, except in the exception path, which therefore only tries it.
//!
//! Control transfers (entering a new process, switching to another, or
//! resuming a parent) always happen after the lock is released.

use core::ptr;

use spin::Mutex;

use super::idt::TrapFrame;
use super::platform::X86Platform;
use super::port::inb;
use super::{cpu, gdt, idt, serial, switch};
use crate::config::{kernel_stack_top, KernelConfig, PAGE_SIZE};
use crate::drivers::keyboard::PS2_DATA_PORT;
use crate::error::{KernelError, KernelResult};
use crate::fs::BootFs;
use crate::interrupts::{FaultInfo, FaultOutcome};
use crate::process::{Context, ContextSlot, HaltOutcome, UserFrame};
use crate::scheduler::TickAction;
use crate::state::KernelState;
use crate::syscall::{
    check_user_buffer, check_user_string, fd_from_user, Syscall, SyscallNumber, SyscallOutcome,
};

type Kernel = KernelState<X86Platform, BootFs<'static>>;

static KERNEL: Mutex<Option<Kernel>> = Mutex::new(None);

/// A control transfer decided while the lock was held.
enum Transfer {
    Enter { frame: UserFrame, save: *mut Context },
    Switch { save: *mut Context, next: *const Context },
    Resume { context: Context, status: i32 },
    /// The interrupted process is gone; wait for the next timer tick.
    Idle,
}

impl Transfer {
    fn after_halt(outcome: HaltOutcome) -> Self {
        match outcome {
            HaltOutcome::Resume { context, status } => Transfer::Resume { context, status },
            HaltOutcome::Respawn(entry) => Transfer::Enter {
                frame: entry.frame,
                save: ptr::null_mut(),
            },
            HaltOutcome::Abandoned => Transfer::Idle,
        }
    }

    /// Perform the transfer. Returns when the saved context is resumed.
    ///
    /// # Safety
    ///
    /// The kernel lock must not be held. Context pointers must point into
    /// the global kernel state.
    unsafe fn run(self) -> i32 {
        match self {
            // SAFETY: guaranteed by the caller; the frame was built by `execute`.
            Transfer::Enter { frame, save } => unsafe { switch::enter_user(&frame, save) },
            Transfer::Switch { save, next } => {
                // SAFETY: `next` was saved by an earlier switch out of that process.
                unsafe { switch::switch_context(save, next) };
                0
            }
            // SAFETY: the parent context was saved by `enter_user` in its `execute`.
            Transfer::Resume { context, status } => unsafe { switch::resume(&context, status) },
            // The terminal has no active process, so the tick discards this stack.
            Transfer::Idle => loop {
                cpu::wait_for_interrupt();
            },
        }
    }
}

fn slot(kernel: &mut Kernel, slot: ContextSlot) -> *mut Context {
    kernel.context_ptr(slot).unwrap_or(ptr::null_mut())
}

// ========================================
// Boot
// ========================================

/// Bring the kernel up on the boot image and idle until the first tick.
pub fn boot(image: &'static [u8]) -> ! {
    let config = KernelConfig::default();
    serial::init_logger(config.log_level);

    // SAFETY: early boot, interrupts are still disabled.
    unsafe {
        gdt::init(kernel_stack_top(0));
        idt::init();
    }

    let fs = match BootFs::new(image) {
        Ok(fs) => fs,
        Err(e) => {
            log::error!("boot image rejected: {}", e);
            cpu::hlt_loop();
        }
    };
    // SAFETY: called once, interrupts disabled, GDT loaded.
    let platform = unsafe { X86Platform::new() };

    {
        let mut guard = KERNEL.lock();
        let kernel = guard.insert(KernelState::new(platform, fs, config));
        kernel.boot();
    }

    loop {
        cpu::wait_for_interrupt();
    }
}

// ========================================
// Hardware interrupts
// ========================================

pub extern "C" fn timer_entry() {
    let transfer = {
        let mut guard = KERNEL.lock();
        let Some(kernel) = guard.as_mut() else {
            return;
        };
        match kernel.timer_tick() {
            Ok(TickAction::Enter { entry, save }) => Transfer::Enter {
                frame: entry.frame,
                save: slot(kernel, save),
            },
            Ok(TickAction::Switch { save, resume }) => Transfer::Switch {
                save: slot(kernel, save),
                next: slot(kernel, ContextSlot::Saved(resume)),
            },
            Err(_) => return,
        }
    };
    #[cfg(feature = "debug-interrupts")]
    log::trace!("timer tick");
    // SAFETY: lock released above; pointers refer to the global state.
    unsafe { transfer.run() };
}

pub extern "C" fn keyboard_entry() {
    // SAFETY: reading the PS/2 data port consumes the pending scancode.
    let scancode = unsafe { inb(PS2_DATA_PORT) };
    if let Some(kernel) = KERNEL.lock().as_mut() {
        kernel.keyboard_interrupt(scancode);
    }
}

pub extern "C" fn clock_entry() {
    if let Some(kernel) = KERNEL.lock().as_mut() {
        kernel.clock_interrupt();
    }
}

// ========================================
// Exceptions
// ========================================

pub extern "C" fn exception_entry(frame: *const TrapFrame) {
    // SAFETY: the stub passes a pointer to the frame it just pushed.
    let frame = unsafe { &*frame };
    let fault = FaultInfo {
        vector: frame.vector as u8,
        error_code: frame.error_code,
        address: cpu::read_cr2(),
        from_user: frame.from_user(),
    };

    let outcome = match KERNEL.try_lock() {
        Some(mut guard) => match guard.as_mut() {
            Some(kernel) => kernel.handle_exception(fault),
            None => FaultOutcome::Fatal,
        },
        None => FaultOutcome::Fatal,
    };

    match outcome {
        FaultOutcome::Terminated(halt) => {
            // SAFETY: lock released at the end of the match above.
            unsafe { Transfer::after_halt(halt).run() };
        }
        FaultOutcome::Fatal => {
            crate::serial_println!(
                "fatal exception {} at eip {:#010x} (cs {:#x}, error {:#x})",
                frame.vector,
                frame.eip,
                frame.cs,
                frame.error_code
            );
            cpu::hlt_loop();
        }
    }
}

// ========================================
// System calls
// ========================================

/// Check that every page of `[ptr, ptr + len)` is user-accessible.
fn user_mapped(kernel: &Kernel, ptr: u32, len: usize) -> KernelResult<()> {
    if len == 0 {
        return Ok(());
    }
    let last = ptr
        .checked_add(len as u32 - 1)
        .ok_or(KernelError::BadAddress)?;
    let space = kernel.address_space();
    let mut page = ptr & !(PAGE_SIZE - 1);
    while page <= last {
        if !space.is_user_accessible(page.max(ptr)) {
            return Err(KernelError::BadAddress);
        }
        page = match page.checked_add(PAGE_SIZE) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(())
}

fn user_buffer<'a>(kernel: &Kernel, ptr: u32, len: u32) -> KernelResult<&'a mut [u8]> {
    let len = check_user_buffer(ptr, len)?;
    user_mapped(kernel, ptr, len)?;
    // SAFETY: the range is mapped user memory of the running process, and
    // the slice does not outlive the system call.
    Ok(unsafe { core::slice::from_raw_parts_mut(ptr as usize as *mut u8, len) })
}

fn user_string<'a>(kernel: &Kernel, ptr: u32) -> KernelResult<&'a [u8]> {
    let limit = check_user_string(ptr)?;
    user_mapped(kernel, ptr, limit)?;
    // SAFETY: as for `user_buffer`.
    let bytes = unsafe { core::slice::from_raw_parts(ptr as usize as *const u8, limit) };
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(limit);
    Ok(&bytes[..len])
}

fn decode<'a>(kernel: &Kernel, nr: u32, a1: u32, a2: u32, a3: u32) -> KernelResult<Syscall<'a>> {
    Ok(match SyscallNumber::try_from(nr)? {
        SyscallNumber::Halt => Syscall::Halt(a1 as u8),
        SyscallNumber::Execute => Syscall::Execute(user_string(kernel, a1)?),
        SyscallNumber::Read => Syscall::Read {
            fd: fd_from_user(a1),
            buf: user_buffer(kernel, a2, a3)?,
        },
        SyscallNumber::Write => Syscall::Write {
            fd: fd_from_user(a1),
            buf: user_buffer(kernel, a2, a3)?,
        },
        SyscallNumber::Open => Syscall::Open(user_string(kernel, a1)?),
        SyscallNumber::Close => Syscall::Close(fd_from_user(a1)),
        SyscallNumber::GetArgs => Syscall::GetArgs(user_buffer(kernel, a1, a2)?),
        SyscallNumber::Vidmap => Syscall::Vidmap(a1),
        SyscallNumber::SetHandler => Syscall::SetHandler {
            signal: a1,
            handler: a2,
        },
        SyscallNumber::SigReturn => Syscall::SigReturn,
    })
}

pub extern "C" fn syscall_entry(nr: u32, a1: u32, a2: u32, a3: u32) -> i32 {
    loop {
        let transfer = {
            let mut guard = KERNEL.lock();
            let Some(kernel) = guard.as_mut() else {
                return KernelError::Unsupported.errno();
            };
            let call = match decode(kernel, nr, a1, a2, a3) {
                Ok(call) => call,
                Err(e) => {
                    log::debug!("syscall {} rejected: {}", nr, e);
                    return e.errno();
                }
            };
            match kernel.dispatch(call) {
                SyscallOutcome::Return(value) => return value,
                SyscallOutcome::Pending => None,
                SyscallOutcome::Enter { entry, save } => Some(Transfer::Enter {
                    frame: entry.frame,
                    save: slot(kernel, save),
                }),
                SyscallOutcome::Resume { context, status } => {
                    Some(Transfer::Resume { context, status })
                }
                SyscallOutcome::Abandon => Some(Transfer::Idle),
            }
        };

        match transfer {
            // SAFETY: lock released; pointers refer to the global state.
            Some(transfer) => return unsafe { transfer.run() },
            None => cpu::wait_for_interrupt(),
        }
    }
}
