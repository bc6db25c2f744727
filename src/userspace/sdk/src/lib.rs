//! Userland interface to the konsoli kernel.
//!
//! Programs are written against the [`System`] trait rather than raw
//! syscalls: [`Kernel`] forwards to the kernel, and (with the `sim`
//! feature) [`sim::SimSystem`] runs the same code against an in-memory OS.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

pub mod io;
#[cfg(target_os = "none")]
pub mod rt;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
mod syscall;
mod system;

pub use konsoli_common::fcntl::OpenFlags;
pub use konsoli_common::SysError;
pub use syscall::{exit, Kernel};
pub use system::{Fd, Pid, System};
