//! PS/2 keyboard decoding.
//!
//! Turns raw set-1 scancodes into the handful of inputs the terminal layer
//! acts on. Layout and shift/caps handling come from `pc-keyboard`; the
//! Ctrl and Alt chords are tracked here.

use pc_keyboard::{layouts, DecodedKey, HandleControl, KeyCode, KeyState, Keyboard, ScancodeSet1};

use crate::terminal::TerminalId;

/// PS/2 data port
pub const PS2_DATA_PORT: u16 = 0x60;

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable ASCII.
    Char(u8),
    Enter,
    Backspace,
    /// Ctrl+L.
    ClearScreen,
    /// Alt+F1..F3.
    SwitchTerminal(TerminalId),
}

pub struct KeyboardDecoder {
    keyboard: Keyboard<layouts::Us104Key, ScancodeSet1>,
    ctrl: bool,
    alt: bool,
}

impl KeyboardDecoder {
    pub fn new() -> Self {
        Self {
            keyboard: Keyboard::new(
                ScancodeSet1::new(),
                layouts::Us104Key,
                HandleControl::Ignore,
            ),
            ctrl: false,
            alt: false,
        }
    }

    /// Feed one scancode; returns an input once a key press is complete.
    pub fn feed(&mut self, scancode: u8) -> Option<KeyInput> {
        let event = self.keyboard.add_byte(scancode).ok().flatten()?;
        let pressed = event.state != KeyState::Up;

        match event.code {
            KeyCode::LControl | KeyCode::RControl => self.ctrl = pressed,
            KeyCode::LAlt | KeyCode::RAltGr => self.alt = pressed,
            KeyCode::F1 if pressed && self.alt => return Some(KeyInput::SwitchTerminal(0)),
            KeyCode::F2 if pressed && self.alt => return Some(KeyInput::SwitchTerminal(1)),
            KeyCode::F3 if pressed && self.alt => return Some(KeyInput::SwitchTerminal(2)),
            _ => {}
        }

        match self.keyboard.process_keyevent(event)? {
            DecodedKey::Unicode('\n') => Some(KeyInput::Enter),
            DecodedKey::Unicode('\u{8}') => Some(KeyInput::Backspace),
            DecodedKey::Unicode('l' | 'L') if self.ctrl => Some(KeyInput::ClearScreen),
            DecodedKey::Unicode(c) if c.is_ascii() && !c.is_ascii_control() => {
                Some(KeyInput::Char(c as u8))
            }
            _ => None,
        }
    }
}

impl Default for KeyboardDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Set-1 make codes; break codes add 0x80.
    const A: u8 = 0x1E;
    const L: u8 = 0x26;
    const ENTER: u8 = 0x1C;
    const BACKSPACE: u8 = 0x0E;
    const LSHIFT: u8 = 0x2A;
    const LCTRL: u8 = 0x1D;
    const LALT: u8 = 0x38;
    const F2: u8 = 0x3C;

    #[test]
    fn test_printable() {
        let mut kb = KeyboardDecoder::new();
        assert_eq!(kb.feed(A), Some(KeyInput::Char(b'a')));
        assert_eq!(kb.feed(A | 0x80), None);
    }

    #[test]
    fn test_shifted() {
        let mut kb = KeyboardDecoder::new();
        assert_eq!(kb.feed(LSHIFT), None);
        assert_eq!(kb.feed(A), Some(KeyInput::Char(b'A')));
        kb.feed(A | 0x80);
        kb.feed(LSHIFT | 0x80);
        assert_eq!(kb.feed(A), Some(KeyInput::Char(b'a')));
    }

    #[test]
    fn test_editing_keys() {
        let mut kb = KeyboardDecoder::new();
        assert_eq!(kb.feed(ENTER), Some(KeyInput::Enter));
        assert_eq!(kb.feed(BACKSPACE), Some(KeyInput::Backspace));
    }

    #[test]
    fn test_ctrl_l_clears() {
        let mut kb = KeyboardDecoder::new();
        kb.feed(LCTRL);
        assert_eq!(kb.feed(L), Some(KeyInput::ClearScreen));
        kb.feed(L | 0x80);
        kb.feed(LCTRL | 0x80);
        assert_eq!(kb.feed(L), Some(KeyInput::Char(b'l')));
    }

    #[test]
    fn test_alt_function_switches_terminal() {
        let mut kb = KeyboardDecoder::new();
        assert_eq!(kb.feed(F2), None);
        kb.feed(F2 | 0x80);

        kb.feed(LALT);
        assert_eq!(kb.feed(F2), Some(KeyInput::SwitchTerminal(1)));
        kb.feed(F2 | 0x80);
        kb.feed(LALT | 0x80);
        assert_eq!(kb.feed(F2), None);
    }
}
