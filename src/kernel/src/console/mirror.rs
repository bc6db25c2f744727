//! Serial rendering of the terminal grid.
//!
//! The serial screen is driven with two ANSI sequences only: clear
//! (`ESC [ 2 J`) and cursor positioning (`ESC [ row ; col H`, 1-based,
//! two digits each). A shadow copy of what the serial screen shows is kept
//! so that each render pass only sends the cells that changed.

use konsoli_common::param::{TERM_COLS, TERM_ROWS};
use konsoli_hal::Serial;

use super::termbuf::{Row, TermBuf};

const ESC: u8 = 0x1b;

/// What the serial screen currently shows, in logical row order.
///
/// There is one serial screen, so one shadow serves every console; a render
/// of another console diffs against whatever was shown last.
pub struct SerialMirror {
    shown: [Row; TERM_ROWS],
    started: bool,
}

impl SerialMirror {
    /// A mirror whose screen is assumed blank.
    pub const fn new() -> Self {
        Self {
            shown: [[b' '; TERM_COLS]; TERM_ROWS],
            started: false,
        }
    }

    /// Sends the clear-screen sequence.
    pub fn clear<S: Serial>(serial: &mut S) {
        serial.write_bytes(&[ESC, b'[', b'2', b'J']);
    }

    fn goto<S: Serial>(serial: &mut S, row: usize, col: usize) {
        let (row, col) = (row + 1, col + 1);
        serial.write_bytes(&[
            ESC,
            b'[',
            b'0' + (row / 10) as u8,
            b'0' + (row % 10) as u8,
            b';',
            b'0' + (col / 10) as u8,
            b'0' + (col % 10) as u8,
            b'H',
        ]);
    }

    /// Brings the serial screen in line with `term`.
    ///
    /// Rows are unrolled from `top_y`, so the serial screen always shows
    /// the oldest line at the top. Rendering unchanged content sends nothing.
    pub fn render<S: Serial>(&mut self, term: &TermBuf, serial: &mut S) {
        if !self.started {
            Self::clear(serial);
            Self::goto(serial, 0, 0);
            self.started = true;
        }
        for (y, shown) in self.shown.iter_mut().enumerate() {
            let row = term.logical_row(y);
            for (x, (old, &new)) in shown.iter_mut().zip(row.iter()).enumerate() {
                if *old != new {
                    *old = new;
                    Self::goto(serial, y, x);
                    serial.write_byte(new);
                }
            }
        }
    }
}

impl Default for SerialMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingSerial;
    use konsoli_hal::ConsoleChar;

    fn term_with(s: &str) -> TermBuf {
        let mut term = TermBuf::new();
        for b in s.bytes() {
            term.put(ConsoleChar::Byte(b));
        }
        term
    }

    #[test]
    fn test_first_render_clears_and_homes() {
        let mut serial = RecordingSerial::new();
        let mut mirror = SerialMirror::new();
        mirror.render(&TermBuf::new(), &mut serial);
        assert_eq!(serial.take(), b"\x1b[2J\x1b[01;01H");
    }

    #[test]
    fn test_only_changed_cells_are_sent() {
        let mut serial = RecordingSerial::new();
        let mut mirror = SerialMirror::new();
        mirror.render(&TermBuf::new(), &mut serial);
        serial.take();

        mirror.render(&term_with("ab"), &mut serial);
        assert_eq!(serial.take(), b"\x1b[01;01Ha\x1b[01;02Hb");

        mirror.render(&term_with("ac"), &mut serial);
        assert_eq!(serial.take(), b"\x1b[01;02Hc");
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut serial = RecordingSerial::new();
        let mut mirror = SerialMirror::new();
        let term = term_with("hello\nworld\n");
        mirror.render(&term, &mut serial);
        assert!(!serial.take().is_empty());
        mirror.render(&term, &mut serial);
        assert!(serial.take().is_empty());
    }

    #[test]
    fn test_scrolled_term_is_unrolled_from_top() {
        let mut serial = RecordingSerial::new();
        let mut mirror = SerialMirror::new();
        let mut text = String::new();
        for i in 0..TERM_ROWS {
            text.push_str(&format!("{}\n", (b'a' + i as u8) as char));
        }
        let term = term_with(&text);
        assert_eq!(term.top_y(), 1);
        mirror.render(&term, &mut serial);
        // Line "a" scrolled away; "b" is shown on the first serial row.
        assert_eq!(mirror.shown[0][0], b'b');
        assert_eq!(mirror.shown[TERM_ROWS - 2][0], b'y');
        assert_eq!(mirror.shown[TERM_ROWS - 1][0], b' ');
        let out = serial.take();
        assert!(out.windows(9).any(|w| w == b"\x1b[01;01Hb"));
        assert!(out.windows(9).any(|w| w == b"\x1b[24;01Hy"));
    }

    #[test]
    fn test_goto_uses_two_digits() {
        let mut serial = RecordingSerial::new();
        SerialMirror::goto(&mut serial, 24, 79);
        assert_eq!(serial.take(), b"\x1b[25;80H");
    }
}
