//! The real kernel behind [`System`].

use core::ffi::{c_char, CStr};
use core::ptr;

use konsoli_common::fcntl::OpenFlags;
use konsoli_common::param::MAX_ARGS;
use konsoli_common::SysError;

use crate::system::{Fd, Pid, System};

extern "C" {
    fn sys_fork() -> i32;
    fn sys_exit(status: i32) -> !;
    fn sys_wait() -> i32;
    fn sys_pipe(fds: *mut i32) -> i32;
    fn sys_read(fd: i32, buf: *mut u8, len: usize) -> i32;
    fn sys_write(fd: i32, buf: *const u8, len: usize) -> i32;
    fn sys_close(fd: i32) -> i32;
    fn sys_dup(fd: i32) -> i32;
    fn sys_open(path: *const c_char, flags: u32) -> i32;
    fn sys_mknod(path: *const c_char, major: u16, minor: u16) -> i32;
    fn sys_chdir(path: *const c_char) -> i32;
    fn sys_exec(path: *const c_char, argv: *const *const c_char) -> i32;
}

/// Terminates the calling process.
pub fn exit(status: i32) -> ! {
    unsafe { sys_exit(status) }
}

/// The running kernel.
#[derive(Debug, Default)]
pub struct Kernel;

fn check(ret: i32) -> Result<i32, SysError> {
    SysError::check(ret)
}

impl System for Kernel {
    fn fork<F>(&mut self, child: F) -> Result<Pid, SysError>
    where
        F: FnOnce(&mut Self) -> i32,
    {
        match check(unsafe { sys_fork() })? {
            0 => {
                let status = child(self);
                exit(status)
            }
            pid => Ok(Pid(pid)),
        }
    }

    fn exec(&mut self, path: &CStr, argv: &[&CStr]) -> Result<i32, SysError> {
        if argv.len() > MAX_ARGS {
            return Err(SysError::InvalidArgument);
        }
        let mut raw: [*const c_char; MAX_ARGS + 1] = [ptr::null(); MAX_ARGS + 1];
        for (slot, arg) in raw.iter_mut().zip(argv) {
            *slot = arg.as_ptr();
        }
        // Only returns on failure.
        check(unsafe { sys_exec(path.as_ptr(), raw.as_ptr()) })?;
        Err(SysError::Io)
    }

    fn wait(&mut self) -> Result<Pid, SysError> {
        check(unsafe { sys_wait() }).map(Pid)
    }

    fn pipe(&mut self) -> Result<(Fd, Fd), SysError> {
        let mut fds = [0i32; 2];
        check(unsafe { sys_pipe(fds.as_mut_ptr()) })?;
        Ok((fds[0], fds[1]))
    }

    fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, SysError> {
        check(unsafe { sys_read(fd, buf.as_mut_ptr(), buf.len()) }).map(|n| n as usize)
    }

    fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, SysError> {
        check(unsafe { sys_write(fd, buf.as_ptr(), buf.len()) }).map(|n| n as usize)
    }

    fn open(&mut self, path: &CStr, flags: OpenFlags) -> Result<Fd, SysError> {
        check(unsafe { sys_open(path.as_ptr(), flags.bits()) })
    }

    fn close(&mut self, fd: Fd) -> Result<(), SysError> {
        check(unsafe { sys_close(fd) }).map(drop)
    }

    fn dup(&mut self, fd: Fd) -> Result<Fd, SysError> {
        check(unsafe { sys_dup(fd) })
    }

    fn mknod(&mut self, path: &CStr, major: u16, minor: u16) -> Result<(), SysError> {
        check(unsafe { sys_mknod(path.as_ptr(), major, minor) }).map(drop)
    }

    fn chdir(&mut self, path: &CStr) -> Result<(), SysError> {
        check(unsafe { sys_chdir(path.as_ptr()) }).map(drop)
    }
}
