//! Two-level x86 paging for the process windows.
//!
//! One directory is shared by every process. Isolation comes from
//! re-pointing the 4 MB user window (directory index 32) at a different
//! physical frame on every switch, so only one process is ever addressable.
//!
//! Layout installed by [`AddressSpace::initialize`]:
//!
//! | Directory index | Maps                                         |
//! |-----------------|----------------------------------------------|
//! | 0               | low table (only the video page is present)  |
//! | 1               | 4 MB kernel page, identity                   |
//! | 32              | current process frame (user)                 |
//! | 33              | video table for memory-mapped video (user)   |

use bitflags::bitflags;

use crate::config::{
    process_frame, KERNEL_BASE, PAGE_SIZE, TERMINAL_COUNT, USER_WINDOW_BASE, VIDEO_BACKING,
    VIDEO_MEMORY, VIDMAP_BASE,
};
use crate::platform::Platform;

/// Entries per directory or table.
pub const ENTRY_COUNT: usize = 1024;

bitflags! {
    /// Directory and table entry flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        /// Entry is present.
        const PRESENT = 1 << 0;
        /// Page is writable.
        const WRITABLE = 1 << 1;
        /// Page is accessible from ring 3.
        const USER = 1 << 2;
        /// Write-through caching.
        const WRITE_THROUGH = 1 << 3;
        /// Disable caching.
        const NO_CACHE = 1 << 4;
        /// Set by the CPU on access.
        const ACCESSED = 1 << 5;
        /// Set by the CPU on write.
        const DIRTY = 1 << 6;
        /// Directory entry maps a 4 MB page.
        const LARGE = 1 << 7;
        /// Not flushed when CR3 is reloaded.
        const GLOBAL = 1 << 8;
    }
}

/// A single directory or table entry.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageEntry(u32);

impl PageEntry {
    const SMALL_MASK: u32 = 0xFFFF_F000;
    const LARGE_MASK: u32 = 0xFFC0_0000;

    /// An entry that maps nothing.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// An entry pointing at `address` with `flags`.
    pub const fn new(address: u32, flags: PageFlags) -> Self {
        Self((address & Self::SMALL_MASK) | flags.bits())
    }

    pub fn flags(&self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0)
    }

    pub fn is_present(&self) -> bool {
        self.flags().contains(PageFlags::PRESENT)
    }

    pub fn is_large(&self) -> bool {
        self.flags().contains(PageFlags::LARGE)
    }

    /// Physical address the entry points to.
    pub fn address(&self) -> u32 {
        if self.is_large() {
            self.0 & Self::LARGE_MASK
        } else {
            self.0 & Self::SMALL_MASK
        }
    }

    /// Raw entry value.
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

/// A page directory or page table.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageEntry; ENTRY_COUNT],
}

impl PageTable {
    /// Create a table with every entry unused.
    pub const fn new() -> Self {
        Self {
            entries: [PageEntry::empty(); ENTRY_COUNT],
        }
    }

    pub fn entry(&self, index: usize) -> PageEntry {
        self.entries[index]
    }

    pub fn set(&mut self, index: usize, entry: PageEntry) {
        self.entries[index] = entry;
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.fill(PageEntry::empty());
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory index covering `address`.
pub const fn directory_index(address: u32) -> usize {
    (address >> 22) as usize
}

/// Table index covering `address`.
pub const fn table_index(address: u32) -> usize {
    ((address >> 12) & 0x3FF) as usize
}

/// The kernel's single set of translation structures.
///
/// The structures must not move once [`initialize`](Self::initialize) has
/// handed their physical addresses to the CPU.
pub struct AddressSpace {
    directory: PageTable,
    low_table: PageTable,
    video_table: PageTable,
    low_table_phys: u32,
    video_table_phys: u32,
}

impl AddressSpace {
    pub const fn new() -> Self {
        Self {
            directory: PageTable::new(),
            low_table: PageTable::new(),
            video_table: PageTable::new(),
            low_table_phys: 0,
            video_table_phys: 0,
        }
    }

    /// Build the boot mappings and turn paging on.
    pub fn initialize<P: Platform>(&mut self, platform: &mut P) {
        self.directory.clear();
        self.low_table.clear();
        self.video_table.clear();

        self.low_table_phys = platform.physical_address(&self.low_table as *const _ as usize);
        self.video_table_phys = platform.physical_address(&self.video_table as *const _ as usize);

        let kernel_rw = PageFlags::PRESENT | PageFlags::WRITABLE;
        self.directory
            .set(0, PageEntry::new(self.low_table_phys, kernel_rw));
        self.low_table.set(
            table_index(VIDEO_MEMORY),
            PageEntry::new(VIDEO_MEMORY, kernel_rw),
        );
        self.directory.set(
            directory_index(KERNEL_BASE),
            PageEntry::new(KERNEL_BASE, kernel_rw | PageFlags::LARGE | PageFlags::GLOBAL),
        );

        let directory = platform.physical_address(&self.directory as *const _ as usize);
        platform.enable_paging(directory);
        log::debug!("paging enabled, directory at {:#010x}", directory);
    }

    /// Point the user window at `pid`'s physical frame.
    ///
    /// `pid` must be below `MAX_PROCESSES`; this is not checked.
    pub fn map_process_window<P: Platform>(&mut self, platform: &mut P, pid: usize) {
        let flags = PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::USER | PageFlags::LARGE;
        self.directory.set(
            directory_index(USER_WINDOW_BASE),
            PageEntry::new(process_frame(pid), flags),
        );
        platform.flush_tlb();
    }

    /// Map the memory-mapped video window at `vaddr`.
    ///
    /// The window shows live video when its terminal is on screen and the
    /// terminal's backing page otherwise.
    pub fn map_video_window<P: Platform>(&mut self, platform: &mut P, vaddr: u32, screen: usize) {
        let terminal = (vaddr.wrapping_sub(VIDMAP_BASE) >> 12) as usize;
        if terminal >= TERMINAL_COUNT {
            return;
        }
        let physical = if terminal == screen {
            VIDEO_MEMORY
        } else {
            VIDEO_BACKING[terminal]
        };
        let flags = PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::USER;

        platform.set_paging(false);
        self.directory.set(
            directory_index(vaddr),
            PageEntry::new(self.video_table_phys, flags),
        );
        self.video_table
            .set(table_index(vaddr), PageEntry::new(physical, flags));
        platform.flush_tlb();
        platform.set_paging(true);
    }

    /// Route the kernel's video page at 0xB8000 to `physical`.
    pub fn map_small_page_for_terminal<P: Platform>(&mut self, platform: &mut P, physical: u32) {
        self.low_table.set(
            table_index(VIDEO_MEMORY),
            PageEntry::new(physical, PageFlags::PRESENT | PageFlags::WRITABLE),
        );
        platform.flush_tlb();
    }

    /// Identity-map the low page at `address`.
    pub fn map_current_video_page<P: Platform>(&mut self, platform: &mut P, address: u32) {
        self.low_table.set(
            table_index(address),
            PageEntry::new(address, PageFlags::PRESENT | PageFlags::WRITABLE),
        );
        platform.flush_tlb();
    }

    /// Walk the structures the way the MMU would.
    pub fn translate(&self, vaddr: u32) -> Option<u32> {
        let pde = self.directory.entry(directory_index(vaddr));
        if !pde.is_present() {
            return None;
        }
        if pde.is_large() {
            return Some(pde.address() | (vaddr & 0x003F_FFFF));
        }

        let table = if pde.address() == self.low_table_phys {
            &self.low_table
        } else if pde.address() == self.video_table_phys {
            &self.video_table
        } else {
            return None;
        };
        let pte = table.entry(table_index(vaddr));
        pte.is_present()
            .then(|| pte.address() | (vaddr & (PAGE_SIZE - 1)))
    }

    /// Whether `vaddr` is reachable from ring 3.
    pub fn is_user_accessible(&self, vaddr: u32) -> bool {
        let pde = self.directory.entry(directory_index(vaddr));
        pde.is_present() && pde.flags().contains(PageFlags::USER) && self.translate(vaddr).is_some()
    }

    pub fn directory_entry(&self, index: usize) -> PageEntry {
        self.directory.entry(index)
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_entry_flags() {
        let entry = PageEntry::new(0x0080_0000, PageFlags::PRESENT | PageFlags::LARGE);
        assert!(entry.is_present());
        assert!(entry.is_large());
        assert_eq!(entry.address(), 0x0080_0000);
        assert_eq!(entry.bits(), 0x0080_0081);
    }

    #[test]
    fn test_small_entry_masks_offset() {
        let entry = PageEntry::new(0x000B_8123, PageFlags::PRESENT | PageFlags::WRITABLE);
        assert_eq!(entry.address(), 0x000B_8000);
        assert!(!entry.is_large());
        assert_eq!(entry.flags(), PageFlags::PRESENT | PageFlags::WRITABLE);
    }

    #[test]
    fn test_empty_entry() {
        let entry = PageEntry::empty();
        assert!(!entry.is_present());
        assert_eq!(entry.bits(), 0);
    }

    #[test]
    fn test_indices() {
        assert_eq!(directory_index(0x0800_0000), 32);
        assert_eq!(directory_index(0x0840_1000), 33);
        assert_eq!(table_index(0x000B_8000), 0xB8);
        assert_eq!(table_index(0x0840_2000), 2);
    }

    #[test]
    fn test_table_alignment() {
        assert_eq!(core::mem::align_of::<PageTable>(), 4096);
        assert_eq!(core::mem::size_of::<PageTable>(), 4096);
    }
}
