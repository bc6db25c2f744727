//! CGA text mode display for x86_64.
//!
//! Renders the raw console stream into the 80x25 text buffer at 0xB8000.
//! The cursor lives in the CRT controller, not in this driver: every
//! character reads it back, moves it and writes it out again.

use core::ptr;

use konsoli_hal::{ConsoleChar, TextDisplay};
use x86_64::instructions::port::Port;

/// CGA text buffer memory-mapped I/O address.
const CGA_BUFFER_ADDR: usize = 0xB8000;

/// CRT controller index port; the data port follows it.
const CRT_PORT: u16 = 0x3d4;

/// CRT registers holding the high and low byte of the cursor position.
const CURSOR_HIGH: u8 = 14;
const CURSOR_LOW: u8 = 15;

/// Number of rows in text mode.
const BUFFER_HEIGHT: usize = 25;

/// Number of columns in text mode.
const BUFFER_WIDTH: usize = 80;

/// Light grey on black.
const ATTRIBUTE: u16 = 0x0700;

const BLANK: u16 = b' ' as u16 | ATTRIBUTE;

/// Effect of one character on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    /// Glyph to store, and where.
    glyph: Option<(usize, u8)>,
    /// Whether the screen moves up one row.
    scroll: bool,
    /// Cursor position afterwards.
    pos: usize,
}

/// Computes where the cursor goes for `c` typed at `pos`.
///
/// # Panics
///
/// Panics when the resulting position leaves the screen. The kernel treats
/// this as a fatal inconsistency and halts.
fn step(pos: usize, c: ConsoleChar) -> Step {
    let mut glyph = None;
    let mut pos = match c {
        ConsoleChar::Byte(b'\n') => pos + BUFFER_WIDTH - pos % BUFFER_WIDTH,
        ConsoleChar::Byte(b'\r') => pos,
        ConsoleChar::Backspace => pos.saturating_sub(1),
        ConsoleChar::Byte(byte) => {
            glyph = Some((pos, byte));
            pos + 1
        }
    };
    if pos > BUFFER_HEIGHT * BUFFER_WIDTH {
        panic!("pos under/overflow");
    }
    let scroll = pos / BUFFER_WIDTH >= BUFFER_HEIGHT - 1;
    if scroll {
        pos -= BUFFER_WIDTH;
    }
    Step { glyph, scroll, pos }
}

/// The primary text display.
pub struct CgaDisplay {
    /// SAFETY: valid for the kernel's lifetime; the CGA buffer is always
    /// mapped in text mode.
    buffer: *mut [u16; BUFFER_WIDTH * BUFFER_HEIGHT],
    index: Port<u8>,
    data: Port<u8>,
}

// SAFETY: CgaDisplay only touches the CGA buffer and CRT ports, both of
// which exist for the kernel's lifetime. Access is serialized by the
// console lock.
unsafe impl Send for CgaDisplay {}

impl CgaDisplay {
    /// Creates a handle on the CGA buffer.
    ///
    /// # Safety
    ///
    /// Must run in kernel mode on a machine with a CGA-compatible adapter,
    /// and only one handle may be in use at a time.
    pub unsafe fn new() -> Self {
        Self {
            buffer: CGA_BUFFER_ADDR as *mut _,
            index: Port::new(CRT_PORT),
            data: Port::new(CRT_PORT + 1),
        }
    }

    fn cursor(&mut self) -> usize {
        // SAFETY: reading the cursor registers has no side effects.
        unsafe {
            self.index.write(CURSOR_HIGH);
            let high = usize::from(self.data.read());
            self.index.write(CURSOR_LOW);
            let low = usize::from(self.data.read());
            high << 8 | low
        }
    }

    fn set_cursor(&mut self, pos: usize) {
        // SAFETY: pos < 25*80 fits the two cursor registers.
        unsafe {
            self.index.write(CURSOR_HIGH);
            self.data.write((pos >> 8) as u8);
            self.index.write(CURSOR_LOW);
            self.data.write(pos as u8);
        }
    }

    fn write_cell(&mut self, pos: usize, cell: u16) {
        debug_assert!(pos < BUFFER_WIDTH * BUFFER_HEIGHT);
        // SAFETY: pos is inside the buffer. Volatile because the buffer is
        // memory-mapped I/O read by the adapter at any time.
        unsafe { ptr::write_volatile(&mut (*self.buffer)[pos], cell) };
    }

    fn scroll_up(&mut self, from: usize) {
        let rows = (BUFFER_HEIGHT - 2) * BUFFER_WIDTH;
        for pos in 0..rows {
            // SAFETY: pos + BUFFER_WIDTH < 24*80, inside the buffer.
            let cell = unsafe { ptr::read_volatile(&(*self.buffer)[pos + BUFFER_WIDTH]) };
            self.write_cell(pos, cell);
        }
        for pos in from..(BUFFER_HEIGHT - 1) * BUFFER_WIDTH {
            self.write_cell(pos, BLANK);
        }
    }
}

impl TextDisplay for CgaDisplay {
    fn put_char(&mut self, c: ConsoleChar) {
        let step = step(self.cursor(), c);
        if let Some((pos, byte)) = step.glyph {
            self.write_cell(pos, u16::from(byte) | ATTRIBUTE);
        }
        if step.scroll {
            self.scroll_up(step.pos);
        }
        self.set_cursor(step.pos);
        self.write_cell(step.pos, BLANK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_advances_cursor() {
        let s = step(81, ConsoleChar::Byte(b'a'));
        assert_eq!(s, Step { glyph: Some((81, b'a')), scroll: false, pos: 82 });
    }

    #[test]
    fn test_newline_moves_to_next_row_start() {
        assert_eq!(step(85, ConsoleChar::Byte(b'\n')).pos, 160);
        assert_eq!(step(160, ConsoleChar::Byte(b'\n')).pos, 240);
    }

    #[test]
    fn test_backspace_stops_at_origin() {
        assert_eq!(step(0, ConsoleChar::Backspace).pos, 0);
        // Unlike the terminal grid, the display may back into the previous row.
        assert_eq!(step(80, ConsoleChar::Backspace).pos, 79);
    }

    #[test]
    fn test_reaching_last_row_scrolls() {
        let s = step(23 * 80 + 5, ConsoleChar::Byte(b'\n'));
        assert!(s.scroll);
        assert_eq!(s.pos, 23 * 80);

        let s = step(24 * 80 - 1, ConsoleChar::Byte(b'x'));
        assert_eq!(s.glyph, Some((24 * 80 - 1, b'x')));
        assert!(s.scroll);
        assert_eq!(s.pos, 23 * 80);
    }

    #[test]
    #[should_panic(expected = "pos under/overflow")]
    fn test_cursor_past_screen_is_fatal() {
        step(25 * 80, ConsoleChar::Byte(b'x'));
    }
}
