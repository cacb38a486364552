//! Boot image file system reader.
//!
//! The image is a sequence of 4 KB blocks, all fields little-endian:
//!
//! - **Block 0**: entry count, inode count, data block count, 52 reserved
//!   bytes, then up to 63 directory entries of 64 bytes each
//!   (32-byte name, type, inode, 24 reserved bytes).
//! - **Blocks 1..=N**: one inode per block: byte length followed by up to
//!   1023 data block numbers.
//! - **Remaining blocks**: file data.

use super::{DirEntry, FileSystem, FsError};
use crate::config::MAX_FILE_NAME;

/// Block size of the image.
pub const BLOCK_SIZE: usize = 4096;

/// Directory entries that fit in the boot block.
pub const MAX_ENTRIES: usize = 63;

/// Data block slots per inode.
pub const BLOCKS_PER_INODE: usize = 1023;

const ENTRY_TABLE_OFFSET: usize = 64;
const ENTRY_SIZE: usize = 64;
const ENTRY_TYPE_OFFSET: usize = 32;
const ENTRY_INODE_OFFSET: usize = 36;

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, FsError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(FsError::InvalidImage)
}

/// A boot image mapped in memory.
#[derive(Debug, Clone, Copy)]
pub struct BootFs<'a> {
    image: &'a [u8],
    entry_count: usize,
    inode_count: usize,
    data_count: usize,
}

impl<'a> BootFs<'a> {
    /// Validate the boot block and the image size.
    pub fn new(image: &'a [u8]) -> Result<Self, FsError> {
        if image.len() < BLOCK_SIZE {
            return Err(FsError::InvalidImage);
        }
        let entry_count = read_u32(image, 0)? as usize;
        let inode_count = read_u32(image, 4)? as usize;
        let data_count = read_u32(image, 8)? as usize;

        if entry_count > MAX_ENTRIES {
            return Err(FsError::InvalidImage);
        }
        let blocks = 1 + inode_count + data_count;
        if image.len() < blocks * BLOCK_SIZE {
            return Err(FsError::InvalidImage);
        }

        log::info!(
            "boot fs: {} entries, {} inodes, {} data blocks",
            entry_count,
            inode_count,
            data_count
        );
        Ok(Self {
            image,
            entry_count,
            inode_count,
            data_count,
        })
    }

    /// Byte length of `inode`.
    pub fn file_length(&self, inode: u32) -> Result<u32, FsError> {
        read_u32(self.image, self.inode_offset(inode)?)
    }

    fn inode_offset(&self, inode: u32) -> Result<usize, FsError> {
        let inode = inode as usize;
        if inode >= self.inode_count {
            return Err(FsError::InvalidInode);
        }
        Ok((1 + inode) * BLOCK_SIZE)
    }

    fn data_offset(&self, block: u32) -> Result<usize, FsError> {
        let block = block as usize;
        if block >= self.data_count {
            return Err(FsError::CorruptBlock);
        }
        Ok((1 + self.inode_count + block) * BLOCK_SIZE)
    }
}

impl FileSystem for BootFs<'_> {
    fn lookup_by_name(&self, name: &[u8]) -> Result<DirEntry, FsError> {
        if name.is_empty() || name.len() > MAX_FILE_NAME {
            return Err(FsError::NoSuchEntry);
        }
        (0..self.entry_count)
            .filter_map(|index| self.lookup_by_index(index).ok())
            .find(|entry| entry.name() == name)
            .ok_or(FsError::NoSuchEntry)
    }

    fn lookup_by_index(&self, index: usize) -> Result<DirEntry, FsError> {
        if index >= self.entry_count {
            return Err(FsError::NoSuchEntry);
        }
        let base = ENTRY_TABLE_OFFSET + index * ENTRY_SIZE;
        let name = &self.image[base..base + MAX_FILE_NAME];
        let kind = read_u32(self.image, base + ENTRY_TYPE_OFFSET)?;
        let inode = read_u32(self.image, base + ENTRY_INODE_OFFSET)?;
        Ok(DirEntry::new(name, kind, inode))
    }

    fn read_bytes(&self, inode: u32, offset: u32, buf: &mut [u8]) -> Result<usize, FsError> {
        let inode_base = self.inode_offset(inode)?;
        let length = self.file_length(inode)?;
        if offset >= length {
            return Ok(0);
        }

        let total = buf.len().min((length - offset) as usize);
        let mut copied = 0;
        while copied < total {
            let position = offset as usize + copied;
            let slot = position / BLOCK_SIZE;
            if slot >= BLOCKS_PER_INODE {
                return Err(FsError::CorruptBlock);
            }
            let block = read_u32(self.image, inode_base + 4 + slot * 4)?;
            let within = position % BLOCK_SIZE;
            let chunk = (BLOCK_SIZE - within).min(total - copied);
            let src = self.data_offset(block)? + within;

            buf[copied..copied + chunk].copy_from_slice(&self.image[src..src + chunk]);
            copied += chunk;
        }
        Ok(copied)
    }

    fn entry_count(&self) -> usize {
        self.entry_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FileType;
    use crate::tests::support::FsImageBuilder;

    #[test]
    fn test_rejects_short_image() {
        assert_eq!(BootFs::new(&[0u8; 100]).unwrap_err(), FsError::InvalidImage);
    }

    #[test]
    fn test_rejects_truncated_image() {
        let mut image = FsImageBuilder::new().file("a", b"abc").build();
        image.truncate(2 * BLOCK_SIZE);
        assert_eq!(BootFs::new(&image).unwrap_err(), FsError::InvalidImage);
    }

    #[test]
    fn test_lookup() {
        let image = FsImageBuilder::new()
            .directory(".")
            .clock("rtc")
            .file("hello", b"hello world")
            .build();
        let fs = BootFs::new(&image).unwrap();

        assert_eq!(fs.entry_count(), 3);
        let entry = fs.lookup_by_name(b"hello").unwrap();
        assert_eq!(entry.file_type(), Ok(FileType::Regular));
        assert_eq!(fs.lookup_by_name(b"rtc").unwrap().file_type(), Ok(FileType::Clock));
        assert_eq!(fs.lookup_by_index(0).unwrap().name(), b".");
        assert_eq!(fs.lookup_by_name(b"hell"), Err(FsError::NoSuchEntry));
        assert_eq!(fs.lookup_by_name(b""), Err(FsError::NoSuchEntry));
        assert_eq!(fs.lookup_by_index(3), Err(FsError::NoSuchEntry));
    }

    #[test]
    fn test_full_length_name() {
        let name = "verylargetextwithverylongname.tx";
        assert_eq!(name.len(), 32);
        let image = FsImageBuilder::new().file(name, b"x").build();
        let fs = BootFs::new(&image).unwrap();

        assert!(fs.lookup_by_name(name.as_bytes()).is_ok());
        assert!(fs.lookup_by_name(b"verylargetextwithverylongname.txt").is_err());
    }

    #[test]
    fn test_read_across_blocks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let image = FsImageBuilder::new().file("big", &data).build();
        let fs = BootFs::new(&image).unwrap();
        let inode = fs.lookup_by_name(b"big").unwrap().inode;

        assert_eq!(fs.file_length(inode), Ok(10_000));

        let mut buf = vec![0u8; 5000];
        assert_eq!(fs.read_bytes(inode, 4000, &mut buf), Ok(5000));
        assert_eq!(&buf[..], &data[4000..9000]);

        assert_eq!(fs.read_bytes(inode, 9000, &mut buf), Ok(1000));
        assert_eq!(&buf[..1000], &data[9000..]);

        assert_eq!(fs.read_bytes(inode, 10_000, &mut buf), Ok(0));
    }

    #[test]
    fn test_invalid_inode() {
        let image = FsImageBuilder::new().file("a", b"abc").build();
        let fs = BootFs::new(&image).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(fs.read_bytes(99, 0, &mut buf), Err(FsError::InvalidInode));
    }
}
