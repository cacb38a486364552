//! VGA text-mode rendering.
//!
//! Draws through whatever page is mapped at `VIDEO_MEMORY`, so the same
//! routines paint the live screen or a terminal's backing page.

use super::port::outb;
use crate::config::VIDEO_MEMORY;
use crate::terminal::Cursor;

pub const COLUMNS: u32 = 80;
pub const ROWS: u32 = 25;
/// Light grey on black.
const ATTRIBUTE: u8 = 0x07;

const CRTC_INDEX: u16 = 0x3D4;
const CRTC_DATA: u16 = 0x3D5;
const CURSOR_HIGH: u8 = 0x0E;
const CURSOR_LOW: u8 = 0x0F;

fn cells() -> *mut u16 {
    VIDEO_MEMORY as usize as *mut u16
}

fn blank() -> u16 {
    u16::from(ATTRIBUTE) << 8 | u16::from(b' ')
}

fn write_cell(x: u32, y: u32, value: u16) {
    let index = (y * COLUMNS + x) as usize;
    // SAFETY: index is below COLUMNS * ROWS and the video page is always mapped.
    unsafe { cells().add(index).write_volatile(value) };
}

fn read_cell(x: u32, y: u32) -> u16 {
    let index = (y * COLUMNS + x) as usize;
    // SAFETY: as for `write_cell`.
    unsafe { cells().add(index).read_volatile() }
}

fn scroll() {
    for y in 1..ROWS {
        for x in 0..COLUMNS {
            write_cell(x, y - 1, read_cell(x, y));
        }
    }
    for x in 0..COLUMNS {
        write_cell(x, ROWS - 1, blank());
    }
}

fn newline(cursor: &mut Cursor) {
    cursor.x = 0;
    if cursor.y + 1 >= ROWS {
        scroll();
    } else {
        cursor.y += 1;
    }
}

pub fn put_char(cursor: &mut Cursor, byte: u8) {
    match byte {
        b'\n' | b'\r' => newline(cursor),
        byte => {
            write_cell(cursor.x, cursor.y, u16::from(ATTRIBUTE) << 8 | u16::from(byte));
            cursor.x += 1;
            if cursor.x >= COLUMNS {
                newline(cursor);
            }
        }
    }
}

pub fn erase_char(cursor: &mut Cursor) {
    if cursor.x > 0 {
        cursor.x -= 1;
    } else if cursor.y > 0 {
        cursor.y -= 1;
        cursor.x = COLUMNS - 1;
    } else {
        return;
    }
    write_cell(cursor.x, cursor.y, blank());
}

pub fn clear(cursor: &mut Cursor) {
    for y in 0..ROWS {
        for x in 0..COLUMNS {
            write_cell(x, y, blank());
        }
    }
    *cursor = Cursor::home();
}

/// Move the hardware cursor.
pub fn show_cursor(cursor: &Cursor) {
    let position = (cursor.y * COLUMNS + cursor.x) as u16;
    // SAFETY: CRT controller cursor location registers.
    unsafe {
        outb(CRTC_INDEX, CURSOR_LOW);
        outb(CRTC_DATA, (position & 0xFF) as u8);
        outb(CRTC_INDEX, CURSOR_HIGH);
        outb(CRTC_DATA, (position >> 8) as u8);
    }
}
