//! Per-console input queue with line-editing state.

use konsoli_common::param::INPUT_BUF;

/// Ring buffer of typed characters.
///
/// Three free-running counters index it: `r` (next byte to hand to a
/// reader), `w` (end of data committed to readers) and `e` (end of data
/// typed so far). Always `r <= w <= e` and `e - r <= INPUT_BUF`; the
/// storage slot of counter `i` is `i % INPUT_BUF`.
#[derive(Clone)]
pub struct InputQueue {
    buf: [u8; INPUT_BUF],
    r: usize,
    w: usize,
    e: usize,
}

impl InputQueue {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            buf: [0; INPUT_BUF],
            r: 0,
            w: 0,
            e: 0,
        }
    }

    /// Whether another character fits without overwriting unread input.
    pub fn has_room(&self) -> bool {
        self.e - self.r < INPUT_BUF
    }

    /// Whether the typed but unread input fills the whole buffer.
    pub fn is_full(&self) -> bool {
        self.e - self.r == INPUT_BUF
    }

    /// Appends a character at the edit position. The caller checks [`has_room`](Self::has_room).
    pub fn push(&mut self, c: u8) {
        debug_assert!(self.has_room());
        self.buf[self.e % INPUT_BUF] = c;
        self.e += 1;
    }

    /// Removes the last uncommitted character, if any.
    pub fn erase(&mut self) -> bool {
        if self.e != self.w {
            self.e -= 1;
            true
        } else {
            false
        }
    }

    /// Removes the last uncommitted character unless it ends a line.
    pub fn erase_in_line(&mut self) -> bool {
        if self.e != self.w && self.buf[(self.e - 1) % INPUT_BUF] != b'\n' {
            self.e -= 1;
            true
        } else {
            false
        }
    }

    /// Releases everything typed so far to readers.
    pub fn commit(&mut self) {
        self.w = self.e;
    }

    /// Whether committed input is waiting to be read.
    pub fn readable(&self) -> bool {
        self.r != self.w
    }

    /// Takes the next committed character. The caller checks [`readable`](Self::readable).
    pub fn pop(&mut self) -> u8 {
        debug_assert!(self.readable());
        let c = self.buf[self.r % INPUT_BUF];
        self.r += 1;
        c
    }

    /// Puts the character just taken back at the front.
    pub fn unpop(&mut self) {
        debug_assert!(self.r > 0);
        self.r -= 1;
    }

    /// The `(read, write, edit)` counters.
    pub fn indices(&self) -> (usize, usize, usize) {
        (self.r, self.w, self.e)
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_is_invisible_until_commit() {
        let mut q = InputQueue::new();
        q.push(b'a');
        q.push(b'b');
        assert!(!q.readable());
        q.commit();
        assert!(q.readable());
        assert_eq!(q.pop(), b'a');
        assert_eq!(q.pop(), b'b');
        assert!(!q.readable());
        assert_eq!(q.indices(), (2, 2, 2));
    }

    #[test]
    fn test_erase_stops_at_commit_point() {
        let mut q = InputQueue::new();
        q.push(b'x');
        q.commit();
        q.push(b'y');
        assert!(q.erase());
        assert!(!q.erase());
        assert_eq!(q.indices(), (0, 1, 1));
    }

    #[test]
    fn test_erase_in_line_stops_at_newline() {
        let mut q = InputQueue::new();
        q.push(b'\n');
        q.push(b'a');
        assert!(q.erase_in_line());
        // The newline is uncommitted here but still bounds the line.
        assert!(!q.erase_in_line());
        assert_eq!(q.indices(), (0, 0, 1));
    }

    #[test]
    fn test_counters_wrap_around_storage() {
        let mut q = InputQueue::new();
        for round in 0..3 {
            for i in 0..INPUT_BUF {
                assert!(q.has_room());
                q.push((i % 251) as u8);
            }
            assert!(q.is_full());
            q.commit();
            for i in 0..INPUT_BUF {
                assert_eq!(q.pop(), (i % 251) as u8, "round {round}");
            }
        }
        assert_eq!(q.indices(), (3 * INPUT_BUF, 3 * INPUT_BUF, 3 * INPUT_BUF));
    }

    #[test]
    fn test_unpop_restores_front() {
        let mut q = InputQueue::new();
        q.push(b'z');
        q.commit();
        assert_eq!(q.pop(), b'z');
        q.unpop();
        assert!(q.readable());
        assert_eq!(q.pop(), b'z');
    }
}
