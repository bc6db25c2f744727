//! Scroll-back grid of one console.

use konsoli_common::param::{TERM_COLS, TERM_ROWS};
use konsoli_hal::ConsoleChar;

/// One row of cells.
pub type Row = [u8; TERM_COLS];

/// Character grid used as a ring of rows.
///
/// `top_y` is the physical row shown first; logical row `r` lives in
/// physical row `(top_y + r) % TERM_ROWS`. Once every row has been used,
/// each new line evicts the oldest one by advancing `top_y`.
#[derive(Clone)]
pub struct TermBuf {
    rows: [Row; TERM_ROWS],
    x: usize,
    y: usize,
    top_y: usize,
    rows_used: usize,
}

impl TermBuf {
    /// A blank grid with the cursor at the origin. The first row counts as used.
    pub const fn new() -> Self {
        Self {
            rows: [[b' '; TERM_COLS]; TERM_ROWS],
            x: 0,
            y: 0,
            top_y: 0,
            rows_used: 1,
        }
    }

    /// Applies one character of output.
    pub fn put(&mut self, c: ConsoleChar) {
        match c {
            ConsoleChar::Backspace => {
                // Never crosses into the previous line.
                if self.x > 0 {
                    self.x -= 1;
                    self.rows[self.y][self.x] = b' ';
                }
            }
            ConsoleChar::Byte(b'\n') => self.new_line(),
            // Input translates CR to LF, so output ignores it.
            ConsoleChar::Byte(b'\r') => {}
            ConsoleChar::Byte(byte) => {
                self.rows[self.y][self.x] = byte;
                self.x += 1;
                if self.x == TERM_COLS {
                    self.new_line();
                }
            }
        }
    }

    fn new_line(&mut self) {
        self.x = 0;
        self.y = (self.y + 1) % TERM_ROWS;
        self.rows[self.y] = [b' '; TERM_COLS];
        if self.rows_used == TERM_ROWS {
            self.top_y = (self.top_y + 1) % TERM_ROWS;
        } else {
            self.rows_used += 1;
        }
    }

    /// Logical row `row`, counted from the oldest visible line.
    pub fn logical_row(&self, row: usize) -> &Row {
        &self.rows[(self.top_y + row) % TERM_ROWS]
    }

    /// Cursor as `(x, y)` in physical coordinates.
    pub fn cursor(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Physical index of the first visible row.
    pub fn top_y(&self) -> usize {
        self.top_y
    }

    /// Number of rows written so far, saturating at the grid height.
    pub fn rows_used(&self) -> usize {
        self.rows_used
    }
}

impl Default for TermBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_str(buf: &mut TermBuf, s: &str) {
        for b in s.bytes() {
            buf.put(ConsoleChar::Byte(b));
        }
    }

    fn row_text(buf: &TermBuf, row: usize) -> String {
        String::from_utf8_lossy(buf.logical_row(row)).trim_end().to_string()
    }

    #[test]
    fn test_plain_text_advances_cursor() {
        let mut buf = TermBuf::new();
        put_str(&mut buf, "hi");
        assert_eq!(buf.cursor(), (2, 0));
        assert_eq!(row_text(&buf, 0), "hi");
    }

    #[test]
    fn test_newline_fills_ring_then_scrolls() {
        let mut buf = TermBuf::new();
        for i in 1..TERM_ROWS {
            buf.put(ConsoleChar::Byte(b'\n'));
            assert_eq!(buf.rows_used(), 1 + i);
            assert_eq!(buf.top_y(), 0);
        }
        for i in 1..=2 * TERM_ROWS {
            buf.put(ConsoleChar::Byte(b'\n'));
            assert_eq!(buf.rows_used(), TERM_ROWS);
            assert_eq!(buf.top_y(), i % TERM_ROWS);
        }
    }

    #[test]
    fn test_scrolled_rows_keep_logical_order() {
        let mut buf = TermBuf::new();
        for i in 0..TERM_ROWS + 3 {
            put_str(&mut buf, &format!("line {i}\n"));
        }
        // The cursor row is blank and sits last; the oldest surviving line comes first.
        assert_eq!(row_text(&buf, 0), "line 4");
        assert_eq!(row_text(&buf, TERM_ROWS - 2), format!("line {}", TERM_ROWS + 2));
        assert_eq!(row_text(&buf, TERM_ROWS - 1), "");
    }

    #[test]
    fn test_wraps_at_last_column() {
        let mut buf = TermBuf::new();
        put_str(&mut buf, &"x".repeat(TERM_COLS));
        assert_eq!(buf.cursor(), (0, 1));
        assert_eq!(buf.rows_used(), 2);
        buf.put(ConsoleChar::Byte(b'y'));
        assert_eq!(row_text(&buf, 1), "y");
    }

    #[test]
    fn test_backspace_stays_on_line() {
        let mut buf = TermBuf::new();
        put_str(&mut buf, "ab\n");
        buf.put(ConsoleChar::Backspace);
        assert_eq!(buf.cursor(), (0, 1));
        put_str(&mut buf, "cd");
        buf.put(ConsoleChar::Backspace);
        assert_eq!(buf.cursor(), (1, 1));
        assert_eq!(row_text(&buf, 1), "c");
        assert_eq!(row_text(&buf, 0), "ab");
    }

    #[test]
    fn test_carriage_return_is_ignored() {
        let mut buf = TermBuf::new();
        put_str(&mut buf, "ab\rc");
        assert_eq!(row_text(&buf, 0), "abc");
        assert_eq!(buf.rows_used(), 1);
    }
}
