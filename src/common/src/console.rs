//! Console identity and the control-code surface of the line discipline.

use core::ffi::CStr;
use core::fmt;

use crate::param::NUM_CONSOLES;

/// Prefix of every console device node; the console index follows as one digit.
pub const DEVICE_PREFIX: &str = "console";

/// Device major number of the console driver.
pub const CONSOLE_MAJOR: u16 = 1;

/// Descriptor of console 0 in a supervised process. Console `i` sits at
/// `FIRST_CONSOLE_FD + i`, right after stdin, stdout and stderr.
pub const FIRST_CONSOLE_FD: i32 = 3;

/// Control-x as typed on a keyboard.
pub const fn ctrl(c: u8) -> u8 {
    c - b'@'
}

/// Erases the pending line.
pub const KILL_LINE: u8 = ctrl(b'U');
/// Erases one pending character.
pub const BACKSPACE: u8 = ctrl(b'H');
/// Erases one pending character (DEL key).
pub const DELETE: u8 = 0x7f;
/// Commits the pending line and marks end of input.
pub const EOF: u8 = ctrl(b'D');
/// Requests a process listing.
pub const PROC_DUMP: u8 = ctrl(b'P');

/// Index of one virtual console, always `< NUM_CONSOLES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsoleId(u8);

impl ConsoleId {
    /// The console the supervisor uses for its own stdio.
    pub const FIRST: ConsoleId = ConsoleId(0);

    /// Returns the console with the given index, if it exists.
    pub const fn new(index: usize) -> Option<Self> {
        if index < NUM_CONSOLES {
            Some(ConsoleId(index as u8))
        } else {
            None
        }
    }

    /// Parses the single decimal digit used in device names and shell arguments.
    pub const fn from_digit(digit: u8) -> Option<Self> {
        if digit.is_ascii_digit() {
            Self::new((digit - b'0') as usize)
        } else {
            None
        }
    }

    /// Iterates over every console in index order.
    pub fn all() -> impl Iterator<Item = ConsoleId> {
        (0..NUM_CONSOLES as u8).map(ConsoleId)
    }

    /// Array index of this console.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// ASCII digit naming this console.
    pub const fn digit(self) -> u8 {
        b'0' + self.0
    }

    /// Descriptor this console occupies in every supervised process.
    pub const fn fd(self) -> i32 {
        FIRST_CONSOLE_FD + self.0 as i32
    }

    /// Device node name, e.g. `console2`.
    pub const fn device_name(self) -> DeviceName {
        let mut buf = [0u8; DEVICE_NAME_LEN];
        let prefix = DEVICE_PREFIX.as_bytes();
        let mut i = 0;
        while i < prefix.len() {
            buf[i] = prefix[i];
            i += 1;
        }
        buf[prefix.len()] = self.digit();
        DeviceName { buf }
    }

    /// The console number as a NUL-terminated argument, e.g. `"2"`.
    pub const fn arg(self) -> ConsoleArg {
        ConsoleArg {
            buf: [self.digit(), 0],
        }
    }
}

impl fmt::Display for ConsoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// prefix + digit + NUL
const DEVICE_NAME_LEN: usize = DEVICE_PREFIX.len() + 2;

/// NUL-terminated device node name.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DeviceName {
    buf: [u8; DEVICE_NAME_LEN],
}

impl DeviceName {
    /// The name as a C string, suitable for path arguments.
    pub fn as_c_str(&self) -> &CStr {
        // The buffer always ends in exactly one NUL.
        match CStr::from_bytes_with_nul(&self.buf) {
            Ok(name) => name,
            Err(_) => c"console",
        }
    }

    /// The name without its terminator.
    pub fn as_str(&self) -> &str {
        let bytes = &self.buf[..DEVICE_NAME_LEN - 1];
        core::str::from_utf8(bytes).unwrap_or(DEVICE_PREFIX)
    }
}

impl fmt::Debug for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NUL-terminated single-digit console argument.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ConsoleArg {
    buf: [u8; 2],
}

impl ConsoleArg {
    /// The argument as a C string.
    pub fn as_c_str(&self) -> &CStr {
        match CStr::from_bytes_with_nul(&self.buf) {
            Ok(arg) => arg,
            Err(_) => c"0",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_ids_are_bounded() {
        assert_eq!(ConsoleId::new(NUM_CONSOLES - 1).map(ConsoleId::index), Some(NUM_CONSOLES - 1));
        assert_eq!(ConsoleId::new(NUM_CONSOLES), None);
        assert_eq!(ConsoleId::all().count(), NUM_CONSOLES);
    }

    #[test]
    fn test_descriptor_convention() {
        let fds: [i32; NUM_CONSOLES] = core::array::from_fn(|i| ConsoleId::new(i).unwrap().fd());
        assert_eq!(fds, [3, 4, 5, 6]);
    }

    #[test]
    fn test_device_name() {
        let id = ConsoleId::from_digit(b'2').unwrap();
        assert_eq!(id.device_name().as_str(), "console2");
        assert_eq!(id.device_name().as_c_str().to_bytes(), b"console2");
        assert_eq!(id.arg().as_c_str().to_bytes(), b"2");
    }

    #[test]
    fn test_from_digit_rejects_non_digits() {
        assert_eq!(ConsoleId::from_digit(b'x'), None);
        assert_eq!(ConsoleId::from_digit(b'9'), None);
    }

    #[test]
    fn test_control_codes() {
        assert_eq!(KILL_LINE, 0x15);
        assert_eq!(BACKSPACE, 0x08);
        assert_eq!(EOF, 0x04);
        assert_eq!(PROC_DUMP, 0x10);
    }
}
