//! Virtual File System
//!
//! Every descriptor is bound at `open` to one capability from a closed set,
//! and all I/O dispatches on it:
//!
//! | Capability   | read                    | write              |
//! |--------------|-------------------------|--------------------|
//! | Stdin        | next line (blocks)      | unsupported        |
//! | Stdout       | unsupported             | echo to terminal   |
//! | Clock        | next virtual tick       | set rate           |
//! | Directory    | next file name          | unsupported        |
//! | RegularFile  | bytes at cursor         | unsupported        |

pub mod fd;

use core::task::Poll;

use crate::error::{KernelError, KernelResult};
use crate::fs::{FileSystem, FileType};
use crate::platform::Platform;
use crate::process::ProcessId;
use crate::state::KernelState;
use crate::terminal::TerminalId;

pub use fd::{DescriptorTable, FileDescriptor};

/// Capability a descriptor is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOps {
    Stdin,
    Stdout,
    Clock,
    Directory,
    RegularFile,
}

impl From<FileType> for FileOps {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Clock => FileOps::Clock,
            FileType::Directory => FileOps::Directory,
            FileType::Regular => FileOps::RegularFile,
        }
    }
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    /// Open `name` in the running process; returns the descriptor index.
    pub fn open(&mut self, name: &[u8]) -> KernelResult<usize> {
        let entry = self
            .fs
            .lookup_by_name(name)
            .map_err(|_| KernelError::NotFound)?;
        let pid = self.running_pid()?;
        let terminal = self.processes.pcb(pid).terminal;

        let descriptors = &mut self.processes.pcb_mut(pid).descriptors;
        descriptors.bind_standard();
        let fd = descriptors.allocate()?;

        let ops = match entry.file_type() {
            Ok(file_type) => FileOps::from(file_type),
            Err(_) => {
                descriptors.release(fd);
                return Err(KernelError::UnsupportedType);
            }
        };
        let inode = if ops == FileOps::RegularFile {
            entry.inode
        } else {
            0
        };
        descriptors.install(fd, FileDescriptor::open(ops, inode));

        if let Err(e) = self.device_open(ops, terminal) {
            self.processes.pcb_mut(pid).descriptors.release(fd);
            return Err(e);
        }
        Ok(fd)
    }

    /// Close descriptor `fd` (2 or above) of the running process.
    pub fn close(&mut self, fd: usize) -> KernelResult<()> {
        let pid = self.running_pid()?;
        self.close_descriptor(pid, fd)
    }

    pub(crate) fn close_descriptor(&mut self, pid: ProcessId, fd: usize) -> KernelResult<()> {
        let pcb = self.processes.pcb(pid);
        if !pcb.descriptors.is_closable(fd) {
            return Err(KernelError::InvalidDescriptor);
        }
        let ops = pcb.descriptors.get(fd)?.ops;
        let terminal = pcb.terminal;

        self.device_close(ops, terminal)?;
        self.processes.pcb_mut(pid).descriptors.release(fd);
        Ok(())
    }

    /// Read without blocking; `Pending` means try again after the next interrupt.
    pub fn poll_read(&mut self, fd: usize, buf: &mut [u8]) -> Poll<KernelResult<usize>> {
        let (pid, terminal, descriptor) = match self.descriptor(fd) {
            Ok(found) => found,
            Err(e) => return Poll::Ready(Err(e)),
        };

        match descriptor.ops {
            FileOps::Stdin => self.terminals[terminal].line.poll_read(buf).map(Ok),
            FileOps::Stdout => Poll::Ready(Err(KernelError::Unsupported)),
            FileOps::Clock => self.clock.poll_wait(terminal).map(|()| Ok(0)),
            FileOps::Directory => Poll::Ready(self.read_directory(pid, fd, buf)),
            FileOps::RegularFile => Poll::Ready(self.read_file(pid, fd, buf)),
        }
    }

    /// Read, idling the CPU until the capability has data.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> KernelResult<usize> {
        loop {
            if let Poll::Ready(result) = self.poll_read(fd, buf) {
                return result;
            }
            self.platform.idle();
        }
    }

    /// Write `buf` through descriptor `fd`.
    pub fn write(&mut self, fd: usize, buf: &[u8]) -> KernelResult<usize> {
        let (_, terminal, descriptor) = self.descriptor(fd)?;

        match descriptor.ops {
            FileOps::Stdin => Err(KernelError::Unsupported),
            FileOps::Stdout => Ok(self.write_terminal(terminal, buf)),
            FileOps::Clock => {
                let bytes: [u8; 4] = buf.try_into().map_err(|_| KernelError::InvalidArgument)?;
                self.clock
                    .set_frequency(terminal, i32::from_le_bytes(bytes))?;
                Ok(bytes.len())
            }
            FileOps::Directory | FileOps::RegularFile => Err(KernelError::Unsupported),
        }
    }

    fn descriptor(&self, fd: usize) -> KernelResult<(ProcessId, TerminalId, FileDescriptor)> {
        let pid = self.running_pid()?;
        let pcb = self.processes.pcb(pid);
        let descriptor = *pcb.descriptors.get(fd)?;
        Ok((pid, pcb.terminal, descriptor))
    }

    fn read_directory(&mut self, pid: ProcessId, fd: usize, buf: &mut [u8]) -> KernelResult<usize> {
        let descriptor = self.processes.pcb_mut(pid).descriptors.get_mut(fd)?;
        let index = descriptor.cursor as usize;
        if index >= self.fs.entry_count() {
            return Ok(0);
        }

        let entry = self
            .fs
            .lookup_by_index(index)
            .map_err(|_| KernelError::IoError)?;
        let name = entry.name();
        let count = name.len().min(buf.len());
        buf[..count].copy_from_slice(&name[..count]);
        descriptor.cursor += 1;
        Ok(count)
    }

    fn read_file(&mut self, pid: ProcessId, fd: usize, buf: &mut [u8]) -> KernelResult<usize> {
        let descriptor = self.processes.pcb_mut(pid).descriptors.get_mut(fd)?;
        let count = self
            .fs
            .read_bytes(descriptor.inode, descriptor.cursor, buf)
            .map_err(|_| KernelError::IoError)?;
        descriptor.cursor += count as u32;
        Ok(count)
    }

    fn device_open(&mut self, ops: FileOps, terminal: TerminalId) -> KernelResult<()> {
        match ops {
            FileOps::Clock => {
                self.clock.open(terminal);
                Ok(())
            }
            FileOps::Stdin | FileOps::Stdout | FileOps::Directory | FileOps::RegularFile => Ok(()),
        }
    }

    /// A failing device reports `DeviceError`; none of the current ones can fail.
    fn device_close(&mut self, ops: FileOps, _terminal: TerminalId) -> KernelResult<()> {
        match ops {
            FileOps::Stdin
            | FileOps::Stdout
            | FileOps::Clock
            | FileOps::Directory
            | FileOps::RegularFile => Ok(()),
        }
    }
}
