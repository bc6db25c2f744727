//! PS/2 keyboard decoding.

use konsoli_common::ConsoleId;
use pc_keyboard::{layouts, DecodedKey, HandleControl, KeyCode, Keyboard, ScancodeSet1};

/// Global keyboard decoder instance.
///
/// Control combinations map to their control codes, so Ctrl-U arrives as
/// the kill-line character.
static KEYBOARD: spin::Mutex<Keyboard<layouts::Us104Key, ScancodeSet1>> =
    spin::Mutex::new(Keyboard::new(
        ScancodeSet1::new(),
        layouts::Us104Key,
        HandleControl::MapLettersToUnicode,
    ));

/// What a key press means to the console subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// A character for the selected console's line discipline.
    Char(u8),
    /// Switch keyboard input to another console.
    Switch(ConsoleId),
}

/// Decode a PS/2 scancode to a console input.
///
/// Returns `None` until a complete key press is received, and for keys
/// the console has no use for.
pub fn decode_scancode(scancode: u8) -> Option<KeyInput> {
    let mut keyboard = KEYBOARD.lock();
    match keyboard.add_byte(scancode) {
        Ok(Some(key_event)) => keyboard.process_keyevent(key_event).and_then(map_key),
        _ => None,
    }
}

fn map_key(key: DecodedKey) -> Option<KeyInput> {
    let switch = |index| ConsoleId::new(index).map(KeyInput::Switch);
    match key {
        DecodedKey::Unicode(c) if c.is_ascii() => Some(KeyInput::Char(c as u8)),
        DecodedKey::Unicode(_) => None,
        DecodedKey::RawKey(KeyCode::F1) => switch(0),
        DecodedKey::RawKey(KeyCode::F2) => switch(1),
        DecodedKey::RawKey(KeyCode::F3) => switch(2),
        DecodedKey::RawKey(KeyCode::F4) => switch(3),
        DecodedKey::RawKey(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_keys_become_chars() {
        assert_eq!(map_key(DecodedKey::Unicode('a')), Some(KeyInput::Char(b'a')));
        assert_eq!(map_key(DecodedKey::Unicode('\u{15}')), Some(KeyInput::Char(0x15)));
        assert_eq!(map_key(DecodedKey::Unicode('é')), None);
    }

    #[test]
    fn test_function_keys_switch_console() {
        assert_eq!(
            map_key(DecodedKey::RawKey(KeyCode::F3)),
            Some(KeyInput::Switch(ConsoleId::new(2).unwrap()))
        );
        assert_eq!(map_key(DecodedKey::RawKey(KeyCode::F9)), None);
    }
}
