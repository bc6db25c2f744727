//! Formatted output and line input over descriptors.

use core::fmt;

use crate::system::{Fd, System};

/// `fmt::Write` adapter writing to a descriptor.
pub struct FdWriter<'a, S> {
    sys: &'a mut S,
    fd: Fd,
}

impl<'a, S: System> FdWriter<'a, S> {
    /// Writes to `fd` of `sys`.
    pub fn new(sys: &'a mut S, fd: Fd) -> Self {
        Self { sys, fd }
    }
}

impl<S: System> fmt::Write for FdWriter<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut rest = s.as_bytes();
        while !rest.is_empty() {
            match self.sys.write(self.fd, rest) {
                Ok(0) | Err(_) => return Err(fmt::Error),
                Ok(n) => rest = &rest[n..],
            }
        }
        Ok(())
    }
}

/// Prints to a descriptor without a newline.
#[macro_export]
macro_rules! fprint {
    ($sys:expr, $fd:expr, $($arg:tt)*) => {
        $crate::io::_fprint($sys, $fd, format_args!($($arg)*))
    };
}

/// Prints to a descriptor with a newline.
#[macro_export]
macro_rules! fprintln {
    ($sys:expr, $fd:expr) => ($crate::fprint!($sys, $fd, "\n"));
    ($sys:expr, $fd:expr, $($arg:tt)*) => ($crate::fprint!($sys, $fd, "{}\n", format_args!($($arg)*)))
}

#[doc(hidden)]
pub fn _fprint<S: System>(sys: &mut S, fd: Fd, args: fmt::Arguments) {
    let _ = fmt::Write::write_fmt(&mut FdWriter::new(sys, fd), args);
}

/// Reads one line from `fd` into `buf`, one byte at a time.
///
/// Stops after a newline or carriage return (kept), at end of input, or
/// when one byte of `buf` is left, which receives a NUL terminator.
/// Returns the number of bytes read; zero means end of input.
pub fn gets<S: System>(sys: &mut S, fd: Fd, buf: &mut [u8]) -> usize {
    let mut n = 0;
    while n + 1 < buf.len() {
        let mut c = [0u8; 1];
        match sys.read(fd, &mut c) {
            Ok(1) => {}
            _ => break,
        }
        buf[n] = c[0];
        n += 1;
        if c[0] == b'\n' || c[0] == b'\r' {
            break;
        }
    }
    if let Some(end) = buf.get_mut(n) {
        *end = 0;
    }
    n
}
