//! konsoli Hardware Abstraction Layer (HAL) traits.
//!
//! The console driver renders every character to two sinks: a UART that
//! mirrors the terminal for a serial screen, and the primary text display.
//! Both are opaque here; the kernel provides the x86_64 implementations.

#![no_std]

/// One unit of console output.
///
/// Backspace is kept apart from the byte range so that a process writing
/// `0x08` is never mistaken for line-editing echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleChar {
    /// An ordinary byte, including `\n` and `\r`.
    Byte(u8),
    /// Erase the cell left of the cursor.
    Backspace,
}

/// Trait for a serial port or similar character-based communication channel.
pub trait Serial {
    /// Writes a single byte to the serial port.
    fn write_byte(&mut self, byte: u8);
    /// Reads a single byte from the serial port, if available.
    fn read_byte(&mut self) -> Option<u8>;

    /// Writes every byte of `bytes` in order.
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }
}

/// Trait for the primary text display.
///
/// The display keeps its own cursor and scrolls on its own; it only ever
/// sees the raw character stream.
pub trait TextDisplay {
    /// Renders one character at the hardware cursor.
    fn put_char(&mut self, c: ConsoleChar);
}
