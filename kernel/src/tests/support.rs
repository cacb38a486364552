//! Test fixtures: a recording platform and a boot image builder.

use std::collections::HashMap;

use crate::config::{KernelConfig, PROGRAM_IMAGE_ADDR, VIDEO_MEMORY};
use crate::error::{KernelError, KernelResult};
use crate::fs::bootfs::{BootFs, BLOCK_SIZE};
use crate::interrupts::{InterruptController, Irq};
use crate::memory::AddressSpace;
use crate::platform::Platform;
use crate::process::ProcessId;
use crate::state::KernelState;
use crate::terminal::Cursor;

// ========================================
// Mock platform
// ========================================

/// Platform that records every request and keeps memory in hash maps.
#[derive(Debug, Default)]
pub struct MockPlatform {
    /// Physical memory written through `copy_to_user`, by byte.
    pub memory: HashMap<u32, u8>,
    /// Text written to each physical video page.
    pub screens: HashMap<u32, Vec<u8>>,
    pub directory: Option<u32>,
    pub paging: bool,
    pub paging_toggles: usize,
    pub tlb_flushes: usize,
    pub kernel_stack: u32,
    pub enabled: Vec<Irq>,
    pub acknowledged: Vec<Irq>,
    pub timer_frequency: Option<u32>,
    pub clock_armed: bool,
    pub clock_acks: usize,
    pub idles: usize,
    pub shown_cursor: Option<Cursor>,
}

impl MockPlatform {
    /// Bytes at physical `address`; unwritten bytes read as 0.
    pub fn read_physical(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| self.memory.get(&(address + i)).copied().unwrap_or(0))
            .collect()
    }

    /// Everything drawn into the video page at `physical`.
    pub fn screen(&self, physical: u32) -> &[u8] {
        self.screens.get(&physical).map_or(&[], Vec::as_slice)
    }

    fn video_page(space: &AddressSpace) -> u32 {
        space
            .translate(VIDEO_MEMORY)
            .expect("video page is always mapped")
    }
}

impl InterruptController for MockPlatform {
    fn enable_irq(&mut self, irq: Irq) {
        self.enabled.push(irq);
    }

    fn disable_irq(&mut self, irq: Irq) {
        self.enabled.retain(|&enabled| enabled != irq);
    }

    fn acknowledge(&mut self, irq: Irq) {
        self.acknowledged.push(irq);
    }
}

impl Platform for MockPlatform {
    fn physical_address(&self, virt: usize) -> u32 {
        (virt & 0xFFFF_F000) as u32
    }

    fn enable_paging(&mut self, directory: u32) {
        self.directory = Some(directory);
        self.paging = true;
    }

    fn set_paging(&mut self, enabled: bool) {
        self.paging = enabled;
        self.paging_toggles += 1;
    }

    fn flush_tlb(&mut self) {
        self.tlb_flushes += 1;
    }

    fn set_kernel_stack(&mut self, stack_top: u32) {
        self.kernel_stack = stack_top;
    }

    fn copy_to_user(&mut self, space: &AddressSpace, address: u32, bytes: &[u8]) -> KernelResult<()> {
        for (i, &byte) in bytes.iter().enumerate() {
            let vaddr = address + i as u32;
            if !space.is_user_accessible(vaddr) {
                return Err(KernelError::BadAddress);
            }
            let physical = space.translate(vaddr).ok_or(KernelError::BadAddress)?;
            self.memory.insert(physical, byte);
        }
        Ok(())
    }

    fn copy_video_page(&mut self, space: &AddressSpace, dst: u32, src: u32) {
        let dst = space.translate(dst).expect("destination mapped");
        let src = space.translate(src).expect("source mapped");
        let contents = self.screens.get(&src).cloned().unwrap_or_default();
        self.screens.insert(dst, contents);
    }

    fn put_char(&mut self, space: &AddressSpace, cursor: &mut Cursor, byte: u8) {
        let page = Self::video_page(space);
        self.screens.entry(page).or_default().push(byte);
        if byte == b'\n' {
            cursor.x = 0;
            cursor.y += 1;
        } else {
            cursor.x += 1;
        }
    }

    fn erase_char(&mut self, space: &AddressSpace, cursor: &mut Cursor) {
        let page = Self::video_page(space);
        self.screens.entry(page).or_default().pop();
        cursor.x = cursor.x.saturating_sub(1);
    }

    fn clear_screen(&mut self, space: &AddressSpace, cursor: &mut Cursor) {
        let page = Self::video_page(space);
        self.screens.insert(page, Vec::new());
        *cursor = Cursor::home();
    }

    fn show_cursor(&mut self, cursor: &Cursor) {
        self.shown_cursor = Some(*cursor);
    }

    fn start_timer(&mut self, frequency: u32) {
        self.timer_frequency = Some(frequency);
    }

    fn arm_periodic_clock(&mut self) {
        self.clock_armed = true;
    }

    fn acknowledge_clock(&mut self) {
        self.clock_acks += 1;
    }

    fn idle(&mut self) {
        self.idles += 1;
    }
}

// ========================================
// Boot image builder
// ========================================

struct Entry {
    name: String,
    kind: u32,
    data: Option<Vec<u8>>,
}

/// Builds boot file system images in memory.
#[derive(Default)]
pub struct FsImageBuilder {
    entries: Vec<Entry>,
}

impl FsImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(self, name: &str) -> Self {
        self.entry(name, 1)
    }

    pub fn clock(self, name: &str) -> Self {
        self.entry(name, 0)
    }

    /// An entry with an arbitrary type and no data.
    pub fn entry(mut self, name: &str, kind: u32) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            kind,
            data: None,
        });
        self
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            kind: 2,
            data: Some(data.to_vec()),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let files: Vec<&Vec<u8>> = self.entries.iter().filter_map(|e| e.data.as_ref()).collect();
        let inode_count = files.len();
        let data_count: usize = files.iter().map(|d| d.len().div_ceil(BLOCK_SIZE)).sum();
        let mut image = vec![0u8; (1 + inode_count + data_count) * BLOCK_SIZE];

        put_u32(&mut image, 0, self.entries.len() as u32);
        put_u32(&mut image, 4, inode_count as u32);
        put_u32(&mut image, 8, data_count as u32);

        let mut inode = 0;
        let mut next_block = 0;
        for (index, entry) in self.entries.iter().enumerate() {
            let base = 64 + index * 64;
            let name = entry.name.as_bytes();
            image[base..base + name.len().min(32)].copy_from_slice(&name[..name.len().min(32)]);
            put_u32(&mut image, base + 32, entry.kind);

            let Some(data) = &entry.data else { continue };
            put_u32(&mut image, base + 36, inode as u32);

            let inode_base = (1 + inode) * BLOCK_SIZE;
            put_u32(&mut image, inode_base, data.len() as u32);
            for (slot, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
                put_u32(&mut image, inode_base + 4 + slot * 4, next_block as u32);
                let start = (1 + inode_count + next_block) * BLOCK_SIZE;
                image[start..start + chunk.len()].copy_from_slice(chunk);
                next_block += 1;
            }
            inode += 1;
        }
        image
    }
}

fn put_u32(image: &mut [u8], offset: usize, value: u32) {
    image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// ========================================
// Kernel fixtures
// ========================================

pub type TestKernel<'a> = KernelState<MockPlatform, BootFs<'a>>;

pub const SHELL_ENTRY: u32 = 0x0804_8100;
pub const CAT_ENTRY: u32 = 0x0804_8200;

/// Contents of `frame0.txt`.
pub const FRAME0: &[u8] = b"/\\/\\/\\/\\/\\/\\/\\/\\/\\/\\/\\\no\n  o    o\n     o\n         o\n  o   o\n";

/// Contents of `large.txt`: spans several blocks.
pub fn large_text() -> Vec<u8> {
    (0..6000u32).map(|i| b'a' + (i % 26) as u8).collect()
}

/// An executable image: magic, entry point at offset 24, then `body`.
pub fn program(entry: u32, body: &[u8]) -> Vec<u8> {
    let mut image = vec![0x7F, b'E', b'L', b'F'];
    image.resize(24, 0);
    image.extend_from_slice(&entry.to_le_bytes());
    image.extend_from_slice(body);
    image
}

/// The image most tests boot from.
pub fn standard_image() -> Vec<u8> {
    FsImageBuilder::new()
        .directory(".")
        .clock("rtc")
        .file("shell", &program(SHELL_ENTRY, b"shell code"))
        .file("cat", &program(CAT_ENTRY, b"cat code"))
        .file("frame0.txt", FRAME0)
        .file("large.txt", &large_text())
        .file("notexec", b"this is plain text and certainly not a program")
        .entry("socket", 7)
        .build()
}

/// Boot a kernel with no processes yet.
pub fn boot(image: &[u8]) -> TestKernel<'_> {
    let fs = BootFs::new(image).expect("valid image");
    let mut kernel = KernelState::new(MockPlatform::default(), fs, KernelConfig::default());
    kernel.boot();
    kernel
}

/// Boot and run the three bootstrap ticks; terminal 2's shell (pid 2) is running.
pub fn boot_with_shells(image: &[u8]) -> TestKernel<'_> {
    let mut kernel = boot(image);
    for _ in 0..3 {
        kernel.timer_tick().expect("bootstrap tick");
    }
    kernel
}

/// Boot and start one shell so terminal 0 is current with pid 0 running.
pub fn boot_single_shell(image: &[u8]) -> TestKernel<'_> {
    let mut kernel = boot(image);
    kernel.timer_tick().expect("first tick");
    assert_eq!(kernel.current_process(), Some(ProcessId(0)));
    kernel
}

/// Where the user window of `pid` keeps its image.
pub fn image_physical(pid: usize) -> u32 {
    crate::config::process_frame(pid) + (PROGRAM_IMAGE_ADDR - crate::config::USER_WINDOW_BASE)
}
