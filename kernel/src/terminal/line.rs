//! Keyboard line discipline.
//!
//! Each terminal keeps two buffers. `echo` mirrors what is visible on the
//! current input line and bounds how far backspace can erase; `pending`
//! collects what the next stdin read returns. Enter bumps the line
//! counter, which is what wakes a blocked reader.

use core::task::Poll;

use crate::config::LINE_BUFFER_SIZE;

/// Fixed-capacity byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBuffer {
    bytes: [u8; LINE_BUFFER_SIZE],
    len: usize,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; LINE_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Append `byte` if the buffer holds fewer than `limit` bytes.
    pub fn push_within(&mut self, byte: u8, limit: usize) -> bool {
        if self.len >= limit.min(LINE_BUFFER_SIZE) {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(core::mem::take(&mut self.bytes[self.len]))
    }

    pub fn clear(&mut self) {
        self.bytes = [0; LINE_BUFFER_SIZE];
        self.len = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-terminal input state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineDiscipline {
    echo: LineBuffer,
    pending: LineBuffer,
    lines: u32,
    reading: bool,
}

impl LineDiscipline {
    pub const fn new() -> Self {
        Self {
            echo: LineBuffer::new(),
            pending: LineBuffer::new(),
            lines: 0,
            reading: false,
        }
    }

    /// Record a printable character. Returns whether it should be echoed.
    pub fn input_char(&mut self, byte: u8) -> bool {
        let echoed = self.echo.push_within(byte, LINE_BUFFER_SIZE - 1);
        self.pending.push_within(byte, LINE_BUFFER_SIZE - 1);
        echoed
    }

    /// Record an end of line.
    pub fn input_enter(&mut self) {
        self.lines += 1;
        self.echo.clear();
        self.pending.push_within(b'\n', LINE_BUFFER_SIZE);
    }

    /// Record a backspace. Returns whether a character should be erased on screen.
    ///
    /// The pending line only shrinks while a reader is waiting on it.
    pub fn input_backspace(&mut self) -> bool {
        let erased = self.echo.pop().is_some();
        if self.reading {
            self.pending.pop();
        }
        erased
    }

    /// Hand a completed line to a reader.
    ///
    /// Copies up to the first newline or `buf.len()` bytes, then the newline
    /// itself if it fits. The pending line is consumed even when the caller's
    /// buffer was too small for all of it.
    pub fn poll_read(&mut self, buf: &mut [u8]) -> Poll<usize> {
        self.reading = true;
        if self.lines == 0 {
            return Poll::Pending;
        }

        let line = self.pending.as_bytes();
        let mut count = line
            .iter()
            .take(buf.len())
            .take_while(|&&b| b != b'\n')
            .count();
        buf[..count].copy_from_slice(&line[..count]);
        if count < buf.len() && line.get(count) == Some(&b'\n') {
            buf[count] = b'\n';
            count += 1;
        }

        self.pending.clear();
        self.lines = 0;
        self.reading = false;
        Poll::Ready(count)
    }

    /// Drop all buffered input.
    pub fn clear(&mut self) {
        self.echo.clear();
        self.pending.clear();
        self.lines = 0;
        self.reading = false;
    }

    pub fn pending(&self) -> &[u8] {
        self.pending.as_bytes()
    }

    pub fn echo(&self) -> &[u8] {
        self.echo.as_bytes()
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn is_reading(&self) -> bool {
        self.reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_line(line: &mut LineDiscipline, text: &[u8]) {
        for &b in text {
            line.input_char(b);
        }
        line.input_enter();
    }

    #[test]
    fn test_read_pending_until_enter() {
        let mut line = LineDiscipline::new();
        let mut buf = [0u8; 32];

        assert_eq!(line.poll_read(&mut buf), Poll::Pending);
        assert!(line.is_reading());

        line.input_char(b'l');
        line.input_char(b's');
        assert_eq!(line.poll_read(&mut buf), Poll::Pending);

        line.input_enter();
        assert_eq!(line.poll_read(&mut buf), Poll::Ready(3));
        assert_eq!(&buf[..3], b"ls\n");
        assert!(!line.is_reading());
        assert_eq!(line.lines(), 0);
        assert!(line.pending().is_empty());
    }

    #[test]
    fn test_read_truncates_to_buffer() {
        let mut line = LineDiscipline::new();
        type_line(&mut line, b"hello");

        let mut buf = [0u8; 3];
        assert_eq!(line.poll_read(&mut buf), Poll::Ready(3));
        assert_eq!(&buf, b"hel");
        // The rest of the line is gone.
        assert!(line.pending().is_empty());
    }

    #[test]
    fn test_newline_fits_exactly() {
        let mut line = LineDiscipline::new();
        type_line(&mut line, b"ab");

        let mut buf = [0u8; 3];
        assert_eq!(line.poll_read(&mut buf), Poll::Ready(3));
        assert_eq!(&buf, b"ab\n");
    }

    #[test]
    fn test_backspace_while_reading() {
        let mut line = LineDiscipline::new();
        let mut buf = [0u8; 16];
        assert_eq!(line.poll_read(&mut buf), Poll::Pending);

        line.input_char(b'a');
        line.input_char(b'x');
        assert!(line.input_backspace());
        line.input_char(b'b');
        line.input_enter();

        assert_eq!(line.poll_read(&mut buf), Poll::Ready(3));
        assert_eq!(&buf[..3], b"ab\n");
    }

    #[test]
    fn test_backspace_without_reader_keeps_pending() {
        let mut line = LineDiscipline::new();
        line.input_char(b'a');
        assert!(line.input_backspace());
        assert!(line.echo().is_empty());
        assert_eq!(line.pending(), b"a");
        assert!(!line.input_backspace());
    }

    #[test]
    fn test_echo_limit() {
        let mut line = LineDiscipline::new();
        for _ in 0..LINE_BUFFER_SIZE - 1 {
            assert!(line.input_char(b'x'));
        }
        assert!(!line.input_char(b'y'));
        assert_eq!(line.echo().len(), LINE_BUFFER_SIZE - 1);

        line.input_enter();
        assert_eq!(line.pending().len(), LINE_BUFFER_SIZE);
        assert_eq!(line.pending().last(), Some(&b'\n'));
    }

    #[test]
    fn test_clear() {
        let mut line = LineDiscipline::new();
        type_line(&mut line, b"abc");
        line.clear();
        assert_eq!(line.lines(), 0);
        assert!(line.pending().is_empty());
        assert!(line.echo().is_empty());
    }
}
