//! Read-only boot file system.
//!
//! The kernel only needs three things from its file system: find an entry
//! by name, enumerate entries by index, and read bytes out of a file. The
//! [`FileSystem`] trait captures that boundary; [`bootfs::BootFs`] reads the
//! flat image the boot loader hands over.

pub mod bootfs;

use core::fmt;

use crate::config::MAX_FILE_NAME;

pub use bootfs::BootFs;

/// Entry type as stored in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FileType {
    /// Real-time clock device.
    Clock = 0,
    /// The (single) directory.
    Directory = 1,
    /// Regular file.
    Regular = 2,
}

impl TryFrom<u32> for FileType {
    type Error = FsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FileType::Clock),
            1 => Ok(FileType::Directory),
            2 => Ok(FileType::Regular),
            _ => Err(FsError::UnknownType(value)),
        }
    }
}

/// A directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    name: [u8; MAX_FILE_NAME],
    /// Raw type field; see [`DirEntry::file_type`].
    pub kind: u32,
    pub inode: u32,
}

impl DirEntry {
    pub fn new(name: &[u8], kind: u32, inode: u32) -> Self {
        let mut stored = [0u8; MAX_FILE_NAME];
        let len = name.len().min(MAX_FILE_NAME);
        stored[..len].copy_from_slice(&name[..len]);
        Self {
            name: stored,
            kind,
            inode,
        }
    }

    /// Name bytes up to the first NUL (at most 32 bytes).
    pub fn name(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_FILE_NAME);
        &self.name[..len]
    }

    pub fn file_type(&self) -> Result<FileType, FsError> {
        FileType::try_from(self.kind)
    }
}

/// File system errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Image too short or counts inconsistent.
    InvalidImage,
    /// No entry with this name or index.
    NoSuchEntry,
    /// Inode index out of range.
    InvalidInode,
    /// Inode references a data block outside the image.
    CorruptBlock,
    /// Entry type has no meaning to the kernel.
    UnknownType(u32),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::InvalidImage => f.write_str("invalid file system image"),
            FsError::NoSuchEntry => f.write_str("no such entry"),
            FsError::InvalidInode => f.write_str("invalid inode"),
            FsError::CorruptBlock => f.write_str("corrupt data block"),
            FsError::UnknownType(kind) => write!(f, "unknown file type {}", kind),
        }
    }
}

/// Operations the kernel needs from its file system.
pub trait FileSystem {
    /// Find an entry by exact name (names longer than 32 bytes never match).
    fn lookup_by_name(&self, name: &[u8]) -> Result<DirEntry, FsError>;

    /// Entry at position `index` in the directory.
    fn lookup_by_index(&self, index: usize) -> Result<DirEntry, FsError>;

    /// Copy bytes of `inode` starting at `offset`; returns 0 at end of file.
    fn read_bytes(&self, inode: u32, offset: u32, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Number of directory entries.
    fn entry_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_decoding() {
        assert_eq!(FileType::try_from(0), Ok(FileType::Clock));
        assert_eq!(FileType::try_from(1), Ok(FileType::Directory));
        assert_eq!(FileType::try_from(2), Ok(FileType::Regular));
        assert_eq!(FileType::try_from(7), Err(FsError::UnknownType(7)));
    }

    #[test]
    fn test_dir_entry_name() {
        let entry = DirEntry::new(b"frame0.txt", 2, 4);
        assert_eq!(entry.name(), b"frame0.txt");

        let long = [b'x'; 40];
        let entry = DirEntry::new(&long, 2, 4);
        assert_eq!(entry.name().len(), MAX_FILE_NAME);
    }
}
