//! Conventions shared by the konsoli kernel and its userland.
//!
//! Everything a process needs to agree on with the console driver lives
//! here: how many consoles exist, what their device nodes are called,
//! which descriptor each console occupies in a supervised process, and
//! which control codes the line discipline reacts to.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod console;
pub mod error;
pub mod fcntl;
pub mod param;

pub use console::ConsoleId;
pub use error::SysError;
