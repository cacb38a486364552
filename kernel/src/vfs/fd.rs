//! File Descriptor Table
//!
//! Fixed per-process array of descriptors. Indices 0 and 1 are always
//! stdin and stdout; the rest are handed out first-fit by `open`.

use super::FileOps;
use crate::config::{FILE_NUM, FIRST_ALLOCATABLE_FD};
use crate::error::{KernelError, KernelResult};

/// An open file descriptor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Capability the descriptor dispatches to.
    pub ops: FileOps,
    /// Inode for regular files, 0 otherwise.
    pub inode: u32,
    /// Byte offset for files, entry index for directories.
    pub cursor: u32,
    pub in_use: bool,
}

impl FileDescriptor {
    pub const fn closed() -> Self {
        Self {
            ops: FileOps::Stdin,
            inode: 0,
            cursor: 0,
            in_use: false,
        }
    }

    pub const fn open(ops: FileOps, inode: u32) -> Self {
        Self {
            ops,
            inode,
            cursor: 0,
            in_use: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    entries: [FileDescriptor; FILE_NUM],
}

impl DescriptorTable {
    pub const fn new() -> Self {
        Self {
            entries: [FileDescriptor::closed(); FILE_NUM],
        }
    }

    /// Bind 0 and 1 to stdin and stdout.
    pub fn bind_standard(&mut self) {
        self.entries[0] = FileDescriptor::open(FileOps::Stdin, 0);
        self.entries[1] = FileDescriptor::open(FileOps::Stdout, 0);
    }

    /// Standard streams bound, everything else closed.
    pub fn reset(&mut self) {
        self.entries = [FileDescriptor::closed(); FILE_NUM];
        self.bind_standard();
    }

    /// Reserve the lowest free index at or above 2.
    pub fn allocate(&mut self) -> KernelResult<usize> {
        let fd = (FIRST_ALLOCATABLE_FD..FILE_NUM)
            .find(|&fd| !self.entries[fd].in_use)
            .ok_or(KernelError::TooManyOpenFiles)?;
        self.entries[fd].in_use = true;
        Ok(fd)
    }

    pub fn install(&mut self, fd: usize, descriptor: FileDescriptor) {
        self.entries[fd] = descriptor;
    }

    pub fn release(&mut self, fd: usize) {
        if let Some(entry) = self.entries.get_mut(fd) {
            *entry = FileDescriptor::closed();
        }
    }

    /// Descriptor `fd` if it is in range and open.
    pub fn get(&self, fd: usize) -> KernelResult<&FileDescriptor> {
        self.entries
            .get(fd)
            .filter(|entry| entry.in_use)
            .ok_or(KernelError::InvalidDescriptor)
    }

    pub fn get_mut(&mut self, fd: usize) -> KernelResult<&mut FileDescriptor> {
        self.entries
            .get_mut(fd)
            .filter(|entry| entry.in_use)
            .ok_or(KernelError::InvalidDescriptor)
    }

    /// Whether `fd` may be passed to `close`.
    pub fn is_closable(&self, fd: usize) -> bool {
        (FIRST_ALLOCATABLE_FD..FILE_NUM).contains(&fd) && self.entries[fd].in_use
    }

    pub fn in_use_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.in_use).count()
    }

    /// Open descriptors at or above 2.
    pub fn open_descriptors(&self) -> impl Iterator<Item = usize> + '_ {
        (FIRST_ALLOCATABLE_FD..FILE_NUM).filter(|&fd| self.entries[fd].in_use)
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}
