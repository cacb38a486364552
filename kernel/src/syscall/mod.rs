//! System call handling module.
//!
//! User programs trap through `int 0x80` with the call number in EAX and
//! up to three arguments in EBX, ECX and EDX. The platform decodes the
//! registers into a [`Syscall`], checking user pointers with the helpers
//! here first, and [`KernelState::dispatch`] runs it.
//!
//! Every failure is reported to user space as `-1`.

use crate::config::{
    vidmap_address, MAX_COMMAND_LENGTH, PAGE_SIZE, TERMINAL_COUNT, USER_WINDOW_BASE,
    USER_WINDOW_END, VIDMAP_BASE,
};
use crate::error::{KernelError, KernelResult};
use crate::fs::FileSystem;
use crate::platform::Platform;
use crate::process::exec::HaltOutcome;
use crate::process::{Context, ContextSlot, UserEntry};
use crate::state::KernelState;

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallNumber {
    /// Terminate the calling process.
    Halt = 1,
    /// Run a program and wait for it.
    Execute = 2,
    /// Read from a file descriptor.
    Read = 3,
    /// Write to a file descriptor.
    Write = 4,
    /// Open a file.
    Open = 5,
    /// Close a file descriptor.
    Close = 6,
    /// Copy the argument string.
    GetArgs = 7,
    /// Map text-mode video memory.
    Vidmap = 8,
    /// Install a signal handler (unsupported).
    SetHandler = 9,
    /// Return from a signal handler (unsupported).
    SigReturn = 10,
}

impl TryFrom<u32> for SyscallNumber {
    type Error = KernelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SyscallNumber::Halt),
            2 => Ok(SyscallNumber::Execute),
            3 => Ok(SyscallNumber::Read),
            4 => Ok(SyscallNumber::Write),
            5 => Ok(SyscallNumber::Open),
            6 => Ok(SyscallNumber::Close),
            7 => Ok(SyscallNumber::GetArgs),
            8 => Ok(SyscallNumber::Vidmap),
            9 => Ok(SyscallNumber::SetHandler),
            10 => Ok(SyscallNumber::SigReturn),
            _ => Err(KernelError::Unsupported),
        }
    }
}

/// A decoded system call.
#[derive(Debug, PartialEq, Eq)]
pub enum Syscall<'a> {
    Halt(u8),
    Execute(&'a [u8]),
    Read { fd: usize, buf: &'a mut [u8] },
    Write { fd: usize, buf: &'a [u8] },
    Open(&'a [u8]),
    Close(usize),
    GetArgs(&'a mut [u8]),
    Vidmap(u32),
    SetHandler { signal: u32, handler: u32 },
    SigReturn,
}

impl Syscall<'_> {
    pub fn number(&self) -> SyscallNumber {
        match self {
            Syscall::Halt(_) => SyscallNumber::Halt,
            Syscall::Execute(_) => SyscallNumber::Execute,
            Syscall::Read { .. } => SyscallNumber::Read,
            Syscall::Write { .. } => SyscallNumber::Write,
            Syscall::Open(_) => SyscallNumber::Open,
            Syscall::Close(_) => SyscallNumber::Close,
            Syscall::GetArgs(_) => SyscallNumber::GetArgs,
            Syscall::Vidmap(_) => SyscallNumber::Vidmap,
            Syscall::SetHandler { .. } => SyscallNumber::SetHandler,
            Syscall::SigReturn => SyscallNumber::SigReturn,
        }
    }
}

/// What the platform does when a system call finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Return the value in EAX.
    Return(i32),
    /// The call would block; wait for an interrupt and dispatch it again.
    Pending,
    /// Save the caller into `save` and iret into a new process.
    Enter { entry: UserEntry, save: ContextSlot },
    /// Abandon the caller and resume `context` returning `status`.
    Resume { context: Context, status: i32 },
    /// The caller no longer exists; idle until the scheduler moves on.
    Abandon,
}

fn complete<T: Into<i64>>(result: KernelResult<T>) -> SyscallOutcome {
    match result {
        Ok(value) => SyscallOutcome::Return(value.into() as i32),
        Err(e) => {
            log::debug!("syscall failed: {}", e);
            SyscallOutcome::Return(e.errno())
        }
    }
}

/// Descriptor argument as passed in a register.
pub fn fd_from_user(raw: u32) -> usize {
    usize::try_from(raw as i32).unwrap_or(usize::MAX)
}

fn in_window(start: u32, end: u32) -> bool {
    let user = start >= USER_WINDOW_BASE && end <= USER_WINDOW_END;
    let video =
        start >= VIDMAP_BASE && end <= VIDMAP_BASE + TERMINAL_COUNT as u32 * PAGE_SIZE;
    user || video
}

/// Validate a read/write buffer and return its length.
///
/// A null buffer counts as a bad descriptor, matching the user-visible
/// contract of `read` and `write`.
pub fn check_user_buffer(ptr: u32, len: u32) -> KernelResult<usize> {
    if ptr == 0 {
        return Err(KernelError::InvalidDescriptor);
    }
    let len = usize::try_from(len as i32).map_err(|_| KernelError::InvalidArgument)?;
    let end = ptr
        .checked_add(len as u32)
        .ok_or(KernelError::BadAddress)?;
    if !in_window(ptr, end) {
        return Err(KernelError::BadAddress);
    }
    Ok(len)
}

/// Validate a string pointer and return how many bytes may be scanned for its NUL.
pub fn check_user_string(ptr: u32) -> KernelResult<usize> {
    if ptr < USER_WINDOW_BASE || ptr >= USER_WINDOW_END {
        return Err(KernelError::BadAddress);
    }
    Ok(((USER_WINDOW_END - ptr) as usize).min(MAX_COMMAND_LENGTH + 1))
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    /// Run a decoded system call for the running process.
    pub fn dispatch(&mut self, call: Syscall<'_>) -> SyscallOutcome {
        #[cfg(feature = "trace-syscalls")]
        log::trace!(
            "syscall {:?} from pid {:?}",
            call.number(),
            self.current_process()
        );

        match call {
            Syscall::Halt(status) => match self.halt(status) {
                Ok(HaltOutcome::Resume { context, status }) => {
                    SyscallOutcome::Resume { context, status }
                }
                Ok(HaltOutcome::Respawn(entry)) => SyscallOutcome::Enter {
                    entry,
                    save: ContextSlot::Discard,
                },
                Ok(HaltOutcome::Abandoned) => SyscallOutcome::Abandon,
                Err(e) => complete::<i32>(Err(e)),
            },
            Syscall::Execute(line) => match self.execute(line) {
                Ok(entry) => SyscallOutcome::Enter {
                    entry,
                    save: ContextSlot::Parent(entry.pid),
                },
                Err(e) => complete::<i32>(Err(e)),
            },
            Syscall::Read { fd, buf } => match self.poll_read(fd, buf) {
                core::task::Poll::Ready(result) => complete(result.map(|n| n as u32)),
                core::task::Poll::Pending => SyscallOutcome::Pending,
            },
            Syscall::Write { fd, buf } => complete(self.write(fd, buf).map(|n| n as u32)),
            Syscall::Open(name) => complete(self.open(name).map(|fd| fd as u32)),
            Syscall::Close(fd) => complete(self.close(fd).map(|()| 0)),
            Syscall::GetArgs(buf) => complete(self.get_arguments(buf).map(|()| 0)),
            Syscall::Vidmap(out) => complete(self.map_video_memory(out)),
            Syscall::SetHandler { signal, handler } => {
                complete(self.set_signal_handler(signal, handler).map(|()| 0))
            }
            Syscall::SigReturn => complete(self.signal_return().map(|()| 0)),
        }
    }

    /// Copy the running process's argument string, NUL-terminated, into `buf`.
    pub fn get_arguments(&mut self, buf: &mut [u8]) -> KernelResult<()> {
        let pid = self.running_pid()?;
        let arguments = self.processes.pcb(pid).arguments.as_bytes();
        if arguments.is_empty() || buf.len() <= arguments.len() {
            return Err(KernelError::InvalidArgument);
        }
        buf[..arguments.len()].copy_from_slice(arguments);
        buf[arguments.len()] = 0;
        Ok(())
    }

    /// Map the caller's terminal video page into user space.
    ///
    /// The window address is stored at `out` (which must lie in the user
    /// window) and returned.
    pub fn map_video_memory(&mut self, out: u32) -> KernelResult<u32> {
        if out < USER_WINDOW_BASE || out > USER_WINDOW_END - 4 {
            return Err(KernelError::BadAddress);
        }
        let pid = self.running_pid()?;
        let terminal = self.processes.pcb(pid).terminal;
        let address = vidmap_address(terminal);

        self.memory
            .map_video_window(&mut self.platform, address, self.screen_terminal);
        self.platform
            .copy_to_user(&self.memory, out, &address.to_le_bytes())
            .map_err(|_| KernelError::BadAddress)?;
        self.terminals[terminal].video_users += 1;
        Ok(address)
    }

    /// Signals are not delivered.
    pub fn set_signal_handler(&mut self, _signal: u32, _handler: u32) -> KernelResult<()> {
        Err(KernelError::Unsupported)
    }

    pub fn signal_return(&mut self) -> KernelResult<()> {
        Err(KernelError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_numbers() {
        assert_eq!(SyscallNumber::try_from(1), Ok(SyscallNumber::Halt));
        assert_eq!(SyscallNumber::try_from(2), Ok(SyscallNumber::Execute));
        assert_eq!(SyscallNumber::try_from(8), Ok(SyscallNumber::Vidmap));
        assert_eq!(SyscallNumber::try_from(10), Ok(SyscallNumber::SigReturn));
        assert_eq!(SyscallNumber::try_from(0), Err(KernelError::Unsupported));
        assert_eq!(SyscallNumber::try_from(11), Err(KernelError::Unsupported));
    }

    #[test]
    fn test_number_roundtrip() {
        for raw in 1..=10u32 {
            let number = SyscallNumber::try_from(raw).unwrap();
            assert_eq!(number as u32, raw);
        }
    }

    #[test]
    fn test_fd_from_user() {
        assert_eq!(fd_from_user(3), 3);
        assert_eq!(fd_from_user(-1i32 as u32), usize::MAX);
    }

    #[test]
    fn test_check_user_buffer() {
        assert_eq!(check_user_buffer(0, 10), Err(KernelError::InvalidDescriptor));
        assert_eq!(check_user_buffer(0x0804_9000, 10), Ok(10));
        assert_eq!(check_user_buffer(0x0804_9000, -1i32 as u32), Err(KernelError::InvalidArgument));
        assert_eq!(check_user_buffer(0x0010_0000, 4), Err(KernelError::BadAddress));
        assert_eq!(check_user_buffer(0x083F_FFFE, 4), Err(KernelError::BadAddress));
        assert_eq!(check_user_buffer(0x0840_1000, 4000), Ok(4000));
    }

    #[test]
    fn test_check_user_string() {
        assert_eq!(check_user_string(0x0804_8000), Ok(MAX_COMMAND_LENGTH + 1));
        assert_eq!(check_user_string(0x083F_FFF0), Ok(16));
        assert_eq!(check_user_string(0), Err(KernelError::BadAddress));
        assert_eq!(check_user_string(USER_WINDOW_END), Err(KernelError::BadAddress));
    }
}
