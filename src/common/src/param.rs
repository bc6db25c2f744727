//! Build-time limits.

/// Number of virtual consoles multiplexed over the display.
pub const NUM_CONSOLES: usize = 4;

/// Rows of the terminal grid backing each console.
pub const TERM_ROWS: usize = 25;

/// Columns of the terminal grid backing each console.
pub const TERM_COLS: usize = 80;

/// Capacity of each console's input queue.
pub const INPUT_BUF: usize = 128;

/// Upper bound on the words of one command. A command reaching this many
/// words is rejected, so at most `MAX_ARGS - 1` are accepted.
pub const MAX_ARGS: usize = 10;

/// Descriptors accepted by `>&<fd>` are `0..MAX_REDIRECT_FD`.
pub const MAX_REDIRECT_FD: i32 = 10;

// Device names carry a single trailing digit.
const _: () = assert!(NUM_CONSOLES <= 10);
