//! System-wide error types for konsoli.

use core::fmt;

/// Failure of a system call or of a kernel operation on behalf of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SysError {
    /// No such file, device or program
    NotFound,
    /// Descriptor is not open or has the wrong access mode
    BadDescriptor,
    /// No child process left to wait for
    NoChild,
    /// The calling process was killed while blocked
    Killed,
    /// Path already exists
    Exists,
    /// Descriptor table or process table is full
    TooManyOpen,
    /// Argument out of range
    InvalidArgument,
    /// Generic I/O error
    Io,
}

impl SysError {
    /// Maps a negative raw system call return value to an error.
    pub fn from_raw(code: i32) -> Self {
        match code {
            -2 => SysError::NotFound,
            -3 => SysError::BadDescriptor,
            -4 => SysError::NoChild,
            -5 => SysError::Killed,
            -6 => SysError::Exists,
            -7 => SysError::TooManyOpen,
            -8 => SysError::InvalidArgument,
            _ => SysError::Io,
        }
    }

    /// Raw system call return value for this error.
    pub fn to_raw(self) -> i32 {
        match self {
            SysError::Io => -1,
            SysError::NotFound => -2,
            SysError::BadDescriptor => -3,
            SysError::NoChild => -4,
            SysError::Killed => -5,
            SysError::Exists => -6,
            SysError::TooManyOpen => -7,
            SysError::InvalidArgument => -8,
        }
    }

    /// Splits a raw return value into success or error.
    pub fn check(ret: i32) -> Result<i32, SysError> {
        if ret < 0 {
            Err(SysError::from_raw(ret))
        } else {
            Ok(ret)
        }
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysError::NotFound => write!(f, "not found"),
            SysError::BadDescriptor => write!(f, "bad file descriptor"),
            SysError::NoChild => write!(f, "no child processes"),
            SysError::Killed => write!(f, "process killed"),
            SysError::Exists => write!(f, "already exists"),
            SysError::TooManyOpen => write!(f, "too many open files"),
            SysError::InvalidArgument => write!(f, "invalid argument"),
            SysError::Io => write!(f, "I/O error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes() {
        assert_eq!(SysError::check(7), Ok(7));
        assert_eq!(SysError::check(-4), Err(SysError::NoChild));
        assert_eq!(SysError::check(-99), Err(SysError::Io));
        assert_eq!(SysError::from_raw(SysError::Killed.to_raw()), SysError::Killed);
    }
}
