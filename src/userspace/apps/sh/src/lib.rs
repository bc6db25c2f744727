//! The console shell.
//!
//! Reads command lines from its console, parses each into a [`Command`]
//! tree and runs the tree as a tree of processes.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

use core::ffi::CStr;

pub mod exec;
pub mod parser;
pub mod shell;
#[cfg(test)]
mod testutil;

pub use parser::{parse, Command, ParseError, RedirectMode};

#[cfg(target_os = "none")]
konsoli_sdk::entry!(shell::main);

/// A word for diagnostics.
pub(crate) fn text(word: &CStr) -> &str {
    word.to_str().unwrap_or("?")
}
