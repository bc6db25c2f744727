//! Process and descriptor primitives.

use core::ffi::CStr;
use core::fmt;

use konsoli_common::fcntl::OpenFlags;
use konsoli_common::SysError;

/// A file descriptor.
pub type Fd = i32;

/// A process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The operating system as seen by one process.
///
/// A process body is a function returning its exit status. `fork` runs the
/// child's body in the new process; whatever it returns becomes the child's
/// exit status.
pub trait System: Sized {
    /// Creates a child process that runs `child` and then exits.
    /// Returns the child's id to the parent.
    fn fork<F>(&mut self, child: F) -> Result<Pid, SysError>
    where
        F: FnOnce(&mut Self) -> i32;

    /// Replaces the process image with program `path`.
    ///
    /// Only returns on failure, except on systems that run programs to
    /// completion in place (the simulator), which return the exit status.
    fn exec(&mut self, path: &CStr, argv: &[&CStr]) -> Result<i32, SysError>;

    /// Waits for any child to exit and returns its id.
    fn wait(&mut self) -> Result<Pid, SysError>;

    /// Creates a pipe, returning `(read end, write end)`.
    fn pipe(&mut self) -> Result<(Fd, Fd), SysError>;

    /// Reads up to `buf.len()` bytes; `Ok(0)` means end of input.
    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, SysError>;

    /// Writes `buf`, returning how much was written.
    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, SysError>;

    /// Opens `path` on the lowest free descriptor.
    fn open(&mut self, path: &CStr, flags: OpenFlags) -> Result<Fd, SysError>;

    /// Closes `fd`.
    fn close(&mut self, fd: Fd) -> Result<(), SysError>;

    /// Duplicates `fd` onto the lowest free descriptor.
    fn dup(&mut self, fd: Fd) -> Result<Fd, SysError>;

    /// Creates a device node.
    fn mknod(&mut self, path: &CStr, major: u16, minor: u16) -> Result<(), SysError>;

    /// Changes the working directory.
    fn chdir(&mut self, path: &CStr) -> Result<(), SysError>;
}
