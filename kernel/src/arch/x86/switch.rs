//! Kernel context transfers.
//!
//! A [`Context`] is captured at a call site: the callee-saved registers,
//! the stack pointer as it will be after the call returns, and the return
//! address. Restoring one makes that call return again, with EAX holding
//! the value passed to [`resume`].
//!
//! Layout offsets used below:
//!
//! | Context | Offset |  | UserFrame | Offset |
//! |---------|--------|--|-----------|--------|
//! | ebx     | 0      |  | eip       | 0      |
//! | esi     | 4      |  | cs        | 4      |
//! | edi     | 8      |  | eflags    | 8      |
//! | ebp     | 12     |  | esp       | 12     |
//! | esp     | 16     |  | ss        | 16     |
//! | eip     | 20     |  |           |        |

use core::arch::naked_asm;

use crate::config::USER_DS;
use crate::process::{Context, UserFrame};

/// Save the caller into `save` (if non-null) and iret to ring 3 through `frame`.
///
/// Returns only when the saved context is resumed, yielding the value
/// handed to [`resume`] (zero after [`switch_context`]).
///
/// # Safety
///
/// `frame` must describe a mapped user entry point; `save`, if non-null,
/// must stay valid until it is resumed.
#[unsafe(naked)]
pub unsafe extern "C" fn enter_user(_frame: *const UserFrame, _save: *mut Context) -> i32 {
    naked_asm!(
        "mov eax, [esp + 8]",
        "test eax, eax",
        "jz 3f",
        "mov [eax + 0], ebx",
        "mov [eax + 4], esi",
        "mov [eax + 8], edi",
        "mov [eax + 12], ebp",
        "lea ecx, [esp + 4]",
        "mov [eax + 16], ecx",
        "mov ecx, [esp]",
        "mov [eax + 20], ecx",
        "3:",
        "mov edx, [esp + 4]",
        "mov ax, {user_ds}",
        "mov ds, ax",
        "mov es, ax",
        "mov fs, ax",
        "mov gs, ax",
        "push dword ptr [edx + 16]",
        "push dword ptr [edx + 12]",
        "push dword ptr [edx + 8]",
        "push dword ptr [edx + 4]",
        "push dword ptr [edx + 0]",
        "iretd",
        user_ds = const USER_DS,
    );
}

/// Save the caller into `save` (if non-null) and resume `next`.
///
/// # Safety
///
/// `next` must hold a context captured by this module whose stack is intact.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(_save: *mut Context, _next: *const Context) {
    naked_asm!(
        "mov eax, [esp + 4]",
        "test eax, eax",
        "jz 3f",
        "mov [eax + 0], ebx",
        "mov [eax + 4], esi",
        "mov [eax + 8], edi",
        "mov [eax + 12], ebp",
        "lea ecx, [esp + 4]",
        "mov [eax + 16], ecx",
        "mov ecx, [esp]",
        "mov [eax + 20], ecx",
        "3:",
        "mov edx, [esp + 8]",
        "mov ebx, [edx + 0]",
        "mov esi, [edx + 4]",
        "mov edi, [edx + 8]",
        "mov ebp, [edx + 12]",
        "mov ecx, [edx + 20]",
        "mov esp, [edx + 16]",
        "xor eax, eax",
        "jmp ecx",
    );
}

/// Abandon the current stack and return `status` from the call that saved `context`.
///
/// # Safety
///
/// Same requirements as the `next` argument of [`switch_context`].
#[unsafe(naked)]
pub unsafe extern "C" fn resume(_context: *const Context, _status: i32) -> ! {
    naked_asm!(
        "mov edx, [esp + 4]",
        "mov eax, [esp + 8]",
        "mov ebx, [edx + 0]",
        "mov esi, [edx + 4]",
        "mov edi, [edx + 8]",
        "mov ebp, [edx + 12]",
        "mov ecx, [edx + 20]",
        "mov esp, [edx + 16]",
        "jmp ecx",
    );
}
