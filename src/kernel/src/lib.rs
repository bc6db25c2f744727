//! konsoli kernel
//!
//! The multi-console terminal subsystem of a small x86_64 kernel.
//!
//! # Architecture
//!
//! The kernel is structured into the following modules:
//! - `console`: Virtual terminal manager, line discipline, serial mirror
//! - `sync`: Interrupt-safe lock and the sleep/wakeup seam
//! - `logger`: `log` backend printing onto the selected console
//! - `arch`: Platform-specific code (CGA display, serial, keyboard, interrupts)
//!
//! # Safety
//!
//! This is a `#![no_std]` kernel. All unsafe code is documented with safety
//! invariants explaining why the usage is correct.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "image", feature(abi_x86_interrupt))]
#![warn(missing_docs)]

pub mod arch;
pub mod console;
pub mod logger;
pub mod sync;

#[cfg(test)]
mod testutil;

/// Initializes core kernel subsystems.
///
/// Sets up the consoles, the logger and interrupt handling, in that order.
#[cfg(all(feature = "image", target_arch = "x86_64"))]
pub fn init() {
    arch::x86_64::machine::init();
}
