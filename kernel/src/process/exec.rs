//! Execute/halt protocol.
//!
//! `execute` loads a program into a fresh slot and produces the frame the
//! platform irets through; the caller's kernel context is parked in the
//! child's control block. `halt` tears the child down and hands that
//! context back together with the exit status, so the original `execute`
//! call returns the status.

use super::context::{Context, UserEntry, UserFrame};
use super::ProcessId;
use crate::config::{
    kernel_stack_top, ENTRY_POINT_OFFSET, EXECUTABLE_MAGIC, FAULT_EXIT_STATUS,
    FIRST_ALLOCATABLE_FD, FILE_NUM, MAX_COMMAND_LENGTH, MAX_IMAGE_SIZE, PROGRAM_IMAGE_ADDR,
};
use crate::error::{KernelError, KernelResult};
use crate::fs::FileSystem;
use crate::platform::Platform;
use crate::state::KernelState;

/// Bytes copied per step while loading an image.
const LOAD_CHUNK: usize = 1024;

/// A parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub command: &'a [u8],
    pub arguments: &'a [u8],
}

impl<'a> CommandLine<'a> {
    /// Split `line` into the command and its argument string.
    ///
    /// The line ends at the first NUL. The command is the first
    /// space-delimited token; the argument is the rest with surrounding
    /// spaces removed.
    pub fn parse(line: &'a [u8]) -> KernelResult<Self> {
        let end = line.iter().position(|&b| b == 0).unwrap_or(line.len());
        let line = &line[..end];
        if line.len() > MAX_COMMAND_LENGTH {
            return Err(KernelError::MalformedCommand);
        }

        let line = trim_spaces(line);
        if line.is_empty() {
            return Err(KernelError::MalformedCommand);
        }
        let split = line.iter().position(|&b| b == b' ').unwrap_or(line.len());
        let (command, rest) = line.split_at(split);
        Ok(Self {
            command,
            arguments: trim_spaces(rest),
        })
    }
}

fn trim_spaces(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// How the platform leaves a halted process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltOutcome {
    /// Restore the parent's kernel context; its `execute` returns `status`.
    Resume { context: Context, status: i32 },
    /// A terminal's shell exited and was replaced; enter the new one.
    Respawn(UserEntry),
    /// A terminal's shell exited and no replacement could be started. The
    /// caller is gone; wait for the next tick, which retries the spawn.
    Abandoned,
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    /// Start `command_line` as a child of the running process.
    pub fn execute(&mut self, command_line: &[u8]) -> KernelResult<UserEntry> {
        self.spawn(command_line, false)
    }

    /// Start a program on the current terminal.
    ///
    /// A terminal root is its own parent and is respawned when it halts.
    pub(crate) fn spawn(&mut self, command_line: &[u8], root: bool) -> KernelResult<UserEntry> {
        let pid = self.processes.allocate()?;
        self.load(pid, command_line, root).map_err(|e| {
            self.processes.release(pid);
            log::debug!("execute failed: {}", e);
            e
        })
    }

    fn load(&mut self, pid: ProcessId, command_line: &[u8], root: bool) -> KernelResult<UserEntry> {
        let command = CommandLine::parse(command_line)?;
        let file = self
            .fs
            .lookup_by_name(command.command)
            .map_err(|_| KernelError::CommandNotFound)?;

        let mut header = [0u8; ENTRY_POINT_OFFSET as usize + 4];
        let read = self
            .fs
            .read_bytes(file.inode, 0, &mut header)
            .map_err(|_| KernelError::NotExecutable)?;
        if read < header.len() || header[..4] != EXECUTABLE_MAGIC {
            return Err(KernelError::NotExecutable);
        }
        let at = ENTRY_POINT_OFFSET as usize;
        let entry_point =
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]);

        let caller = self.current_process();
        self.memory.map_process_window(&mut self.platform, pid.0);
        let loaded = match self.copy_image(file.inode) {
            Ok(loaded) => loaded,
            Err(e) => {
                if let Some(caller) = caller {
                    self.memory.map_process_window(&mut self.platform, caller.0);
                }
                return Err(e);
            }
        };

        let terminal = self.current_terminal;
        let parent = if root { pid } else { caller.unwrap_or(pid) };
        self.processes
            .pcb_mut(pid)
            .reset(parent, terminal, command.arguments, root);
        self.terminals[terminal].active_process = Some(pid);
        self.platform.set_kernel_stack(kernel_stack_top(pid.0));

        log::info!(
            "pid {} started on terminal {}: {} ({} bytes, entry {:#010x})",
            pid,
            terminal,
            core::str::from_utf8(command.command).unwrap_or("?"),
            loaded,
            entry_point
        );
        Ok(UserEntry {
            pid,
            frame: UserFrame::new(entry_point),
        })
    }

    /// Copy the file at `inode` to the program image address.
    fn copy_image(&mut self, inode: u32) -> KernelResult<usize> {
        let mut chunk = [0u8; LOAD_CHUNK];
        let mut offset = 0;
        while offset < MAX_IMAGE_SIZE {
            let want = LOAD_CHUNK.min(MAX_IMAGE_SIZE - offset);
            let count = self
                .fs
                .read_bytes(inode, offset as u32, &mut chunk[..want])
                .map_err(|_| KernelError::LoadError)?;
            if count == 0 {
                break;
            }
            self.platform
                .copy_to_user(
                    &self.memory,
                    PROGRAM_IMAGE_ADDR + offset as u32,
                    &chunk[..count],
                )
                .map_err(|_| KernelError::LoadError)?;
            offset += count;
        }
        Ok(offset)
    }

    /// Terminate the running process with `status`.
    pub fn halt(&mut self, status: u8) -> KernelResult<HaltOutcome> {
        let pid = self.running_pid()?;
        let pcb = self.processes.pcb(pid);
        let terminal = pcb.terminal;
        let parent = pcb.parent;
        let root = pcb.terminal_root;
        let context = pcb.parent_context;
        let status = if pcb.faulted {
            FAULT_EXIT_STATUS
        } else {
            i32::from(status)
        };

        self.terminals[terminal].line.clear();
        let users = &mut self.terminals[terminal].video_users;
        *users = users.saturating_sub(1);

        self.processes.release(pid);
        for fd in FIRST_ALLOCATABLE_FD..FILE_NUM {
            if self.processes.pcb(pid).descriptors.is_closable(fd) {
                if let Err(e) = self.close_descriptor(pid, fd) {
                    log::warn!("pid {}: closing descriptor {} failed: {}", pid, fd, e);
                }
            }
        }
        log::info!("pid {} halted with status {}", pid, status);

        if root {
            self.terminals[terminal].active_process = None;
            let shell = self.config.shell;
            return Ok(match self.spawn(shell, true) {
                Ok(entry) => HaltOutcome::Respawn(entry),
                Err(e) => {
                    log::error!("cannot restart shell on terminal {}: {}", terminal, e);
                    HaltOutcome::Abandoned
                }
            });
        }

        self.memory.map_process_window(&mut self.platform, parent.0);
        self.terminals[terminal].active_process = Some(parent);
        self.platform.set_kernel_stack(kernel_stack_top(parent.0));
        Ok(HaltOutcome::Resume { context, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_only() {
        let line = CommandLine::parse(b"shell").unwrap();
        assert_eq!(line.command, b"shell");
        assert_eq!(line.arguments, b"");
    }

    #[test]
    fn test_parse_with_arguments() {
        let line = CommandLine::parse(b"  cat   frame0.txt  ").unwrap();
        assert_eq!(line.command, b"cat");
        assert_eq!(line.arguments, b"frame0.txt");

        let line = CommandLine::parse(b"grep a b c").unwrap();
        assert_eq!(line.command, b"grep");
        assert_eq!(line.arguments, b"a b c");
    }

    #[test]
    fn test_parse_stops_at_nul() {
        let line = CommandLine::parse(b"ls\0garbage").unwrap();
        assert_eq!(line.command, b"ls");
        assert_eq!(line.arguments, b"");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(CommandLine::parse(b""), Err(KernelError::MalformedCommand));
        assert_eq!(CommandLine::parse(b"    "), Err(KernelError::MalformedCommand));
        assert_eq!(CommandLine::parse(b"\0ls"), Err(KernelError::MalformedCommand));
    }

    #[test]
    fn test_parse_length_limit() {
        let mut line = [b'a'; MAX_COMMAND_LENGTH + 1];
        assert_eq!(CommandLine::parse(&line), Err(KernelError::MalformedCommand));

        line[MAX_COMMAND_LENGTH] = 0;
        assert!(CommandLine::parse(&line).is_ok());
    }
}
