//! Which console receives typed input.

use core::sync::atomic::{AtomicU8, Ordering};

use konsoli_common::ConsoleId;

/// The console keyboard and serial input are fed into.
///
/// Owned by the input glue and passed explicitly to
/// [`ConsoleDriver::feed`](super::ConsoleDriver::feed); the driver itself
/// has no notion of a current console.
pub struct ConsoleSelector(AtomicU8);

impl ConsoleSelector {
    /// A selector pointing at the first console.
    pub const fn new() -> Self {
        ConsoleSelector(AtomicU8::new(0))
    }

    /// The currently selected console.
    pub fn current(&self) -> ConsoleId {
        ConsoleId::new(usize::from(self.0.load(Ordering::Acquire))).unwrap_or(ConsoleId::FIRST)
    }

    /// Selects `console`. Returns whether the selection changed.
    pub fn select(&self, console: ConsoleId) -> bool {
        self.0.swap(console.index() as u8, Ordering::AcqRel) != console.index() as u8
    }
}

impl Default for ConsoleSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector() {
        let selector = ConsoleSelector::new();
        assert_eq!(selector.current(), ConsoleId::FIRST);
        assert!(selector.select(ConsoleId::new(3).unwrap()));
        assert!(!selector.select(ConsoleId::new(3).unwrap()));
        assert_eq!(selector.current().index(), 3);
    }
}
