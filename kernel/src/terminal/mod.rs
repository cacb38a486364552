//! Terminal Subsystem
//!
//! Three virtual terminals share one text screen. The terminal on screen
//! draws into live video memory; the others draw into their backing pages
//! and are copied in when the user switches to them.

pub mod line;

use crate::config::{vidmap_address, TERMINAL_COUNT, VIDEO_BACKING, VIDEO_MEMORY};
use crate::drivers::KeyInput;
use crate::fs::FileSystem;
use crate::interrupts::Irq;
use crate::platform::Platform;
use crate::process::ProcessId;
use crate::state::KernelState;

pub use line::LineDiscipline;

/// Index of a terminal, `0..TERMINAL_COUNT`.
pub type TerminalId = usize;

/// Text-mode cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub x: u32,
    pub y: u32,
}

impl Cursor {
    pub const fn home() -> Self {
        Self { x: 0, y: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    pub id: TerminalId,
    /// Innermost running process on this terminal.
    pub active_process: Option<ProcessId>,
    /// Processes holding a memory-mapped video window.
    pub video_users: u32,
    pub cursor: Cursor,
    pub line: LineDiscipline,
}

impl Terminal {
    pub const fn new(id: TerminalId) -> Self {
        Self {
            id,
            active_process: None,
            video_users: 0,
            cursor: Cursor::home(),
            line: LineDiscipline::new(),
        }
    }
}

impl<P: Platform, F: FileSystem> KernelState<P, F> {
    /// Keyboard interrupt: decode and apply one scancode.
    pub fn keyboard_interrupt(&mut self, scancode: u8) {
        if let Some(input) = self.keyboard.feed(scancode) {
            self.handle_key(input);
        }
        self.platform.acknowledge(Irq::KEYBOARD);
    }

    /// Apply a decoded key to the terminal on screen.
    pub fn handle_key(&mut self, input: KeyInput) {
        let screen = self.screen_terminal;
        self.route_video(screen);

        match input {
            KeyInput::Char(byte) => {
                if self.terminals[screen].line.input_char(byte) {
                    self.platform
                        .put_char(&self.memory, &mut self.terminals[screen].cursor, byte);
                }
            }
            KeyInput::Enter => {
                self.terminals[screen].line.input_enter();
                self.platform
                    .put_char(&self.memory, &mut self.terminals[screen].cursor, b'\n');
            }
            KeyInput::Backspace => {
                if self.terminals[screen].line.input_backspace() {
                    self.platform
                        .erase_char(&self.memory, &mut self.terminals[screen].cursor);
                }
            }
            KeyInput::ClearScreen => {
                self.platform
                    .clear_screen(&self.memory, &mut self.terminals[screen].cursor);
            }
            KeyInput::SwitchTerminal(next) => self.switch_screen(next),
        }

        let screen = self.screen_terminal;
        self.platform.show_cursor(&self.terminals[screen].cursor);
    }

    /// Render `bytes` on `terminal`, on screen or into its backing page.
    pub fn write_terminal(&mut self, terminal: TerminalId, bytes: &[u8]) -> usize {
        self.route_video(terminal);
        for &byte in bytes {
            self.platform
                .put_char(&self.memory, &mut self.terminals[terminal].cursor, byte);
        }
        if terminal == self.screen_terminal {
            self.platform.show_cursor(&self.terminals[terminal].cursor);
        } else {
            self.route_video(self.screen_terminal);
        }
        bytes.len()
    }

    /// Bring `next` onto the screen.
    pub fn switch_screen(&mut self, next: TerminalId) {
        let previous = self.screen_terminal;
        if next >= TERMINAL_COUNT || next == previous {
            return;
        }

        self.memory
            .map_current_video_page(&mut self.platform, VIDEO_MEMORY);
        self.memory
            .map_current_video_page(&mut self.platform, VIDEO_BACKING[previous]);
        self.platform
            .copy_video_page(&self.memory, VIDEO_BACKING[previous], VIDEO_MEMORY);
        self.memory
            .map_current_video_page(&mut self.platform, VIDEO_BACKING[next]);
        self.platform
            .copy_video_page(&self.memory, VIDEO_MEMORY, VIDEO_BACKING[next]);

        self.screen_terminal = next;
        for terminal in 0..TERMINAL_COUNT {
            if self.terminals[terminal].video_users > 0 {
                self.memory
                    .map_video_window(&mut self.platform, vidmap_address(terminal), next);
            }
        }

        self.route_video(next);
        self.platform.show_cursor(&self.terminals[next].cursor);
        log::debug!("screen switched from terminal {} to {}", previous, next);
    }

    /// Point the kernel's video page at `terminal`'s output.
    fn route_video(&mut self, terminal: TerminalId) {
        let target = if terminal == self.screen_terminal {
            VIDEO_MEMORY
        } else {
            VIDEO_BACKING[terminal]
        };
        self.memory
            .map_small_page_for_terminal(&mut self.platform, target);
    }
}
