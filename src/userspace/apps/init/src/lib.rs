//! The console supervisor, first user process.
//!
//! Opens every console device and keeps one shell running on each.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

use core::ffi::CStr;

use konsoli_sdk::{fprintln, System};

pub mod supervisor;

pub use supervisor::{SuperviseError, Supervisor};

#[cfg(target_os = "none")]
konsoli_sdk::entry!(main);

/// Entry point. Only returns if supervision breaks down.
pub fn main<S: System>(sys: &mut S, _args: &[&CStr]) -> i32 {
    let mut supervisor = Supervisor::new();
    let err = match supervisor.provision(sys) {
        Ok(()) => supervisor.run(sys),
        Err(err) => err,
    };
    fprintln!(sys, 1, "init: {}", err);
    1
}
