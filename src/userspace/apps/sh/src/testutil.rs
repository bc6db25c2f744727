//! Simulated system with the programs the shell tests run.

use std::ffi::CStr;

use konsoli_common::console::ConsoleId;
use konsoli_sdk::sim::SimSystem;
use konsoli_sdk::System;

use crate::exec::run;
use crate::parser::parse;

/// A system laid out like a supervised process: descriptors 0, 1 and 2 on
/// console 0 and console `i` on descriptor `3 + i`, with `echo` and `cat`
/// installed.
pub fn console_sim() -> SimSystem {
    let mut sys = SimSystem::new();
    for _ in 0..3 {
        sys.attach_console(0);
    }
    for id in ConsoleId::all() {
        assert_eq!(sys.attach_console(id.index() as u16), id.fd());
    }
    sys.add_program("echo", echo);
    sys.add_program("cat", cat);
    sys
}

/// Parses and runs `line` in the current process.
pub fn run_line(sys: &mut SimSystem, line: &str) -> i32 {
    let mut buf = line.as_bytes().to_vec();
    buf.push(0);
    let cmd = parse(&mut buf).unwrap();
    run(sys, &cmd)
}

fn echo(sys: &mut SimSystem, argv: &[&CStr]) -> i32 {
    let words: Vec<&[u8]> = argv[1..].iter().map(|arg| arg.to_bytes()).collect();
    let mut line = words.join(&b' ');
    line.push(b'\n');
    let _ = sys.write(1, &line);
    0
}

fn cat(sys: &mut SimSystem, _argv: &[&CStr]) -> i32 {
    let mut buf = [0u8; 64];
    while let Ok(n @ 1..) = sys.read(0, &mut buf) {
        let _ = sys.write(1, &buf[..n]);
    }
    0
}
