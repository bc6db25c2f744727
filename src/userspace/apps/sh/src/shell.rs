//! The shell's main loop and its built-in commands.

use core::ffi::CStr;

use konsoli_common::console::ConsoleId;
use konsoli_sdk::io::gets;
use konsoli_sdk::{fprint, fprintln, System};

use crate::{exec, parser};

/// Size of the command-line buffer.
pub const LINE_MAX: usize = 100;

/// What to do with a line after the built-ins have looked at it.
#[derive(Debug, PartialEq, Eq)]
enum Builtin {
    /// Handled; prompt again.
    Done,
    /// Run the (possibly rewritten) line.
    Run,
}

/// Entry point: `sh <console>`.
///
/// Binds descriptors 0, 1 and 2 to the console's descriptor, then prompts,
/// reads and runs lines until end of input.
pub fn main<S: System>(sys: &mut S, args: &[&CStr]) -> i32 {
    if args.len() != 2 {
        fprintln!(sys, 2, "incorrect number of arguments to sh");
        return 1;
    }
    let Some(console) = args[1].to_bytes().first().copied().and_then(ConsoleId::from_digit) else {
        fprintln!(sys, 2, "invalid console");
        return 1;
    };

    for fd in 0..3 {
        let _ = sys.close(fd);
    }
    for _ in 0..3 {
        if sys.dup(console.fd()).is_err() {
            return 1;
        }
    }

    loop {
        let mut buf = [0u8; LINE_MAX];
        fprint!(sys, 2, "{}> ", console);
        if gets(sys, 0, &mut buf) == 0 {
            return 0;
        }
        if builtin(sys, console, &mut buf) == Builtin::Done {
            continue;
        }
        let child = sys.fork(|sys| match parser::parse(&mut buf) {
            Ok(cmd) => exec::run(sys, &cmd),
            Err(err) => {
                fprintln!(sys, 2, "{}", err);
                1
            }
        });
        if child.is_err() {
            fprintln!(sys, 2, "fork");
            return 1;
        }
        let _ = sys.wait();
    }
}

/// Handles the commands that must run in the shell process itself.
///
/// `cd <dir>` changes this process's directory. `sh` and `sh ...` start a
/// nested shell on this console, whatever arguments were typed.
fn builtin<S: System>(sys: &mut S, console: ConsoleId, buf: &mut [u8; LINE_MAX]) -> Builtin {
    if buf.starts_with(b"cd ") {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(LINE_MAX);
        if len > 3 && buf[len - 1] == b'\n' {
            buf[len - 1] = 0;
        }
        let dir = CStr::from_bytes_until_nul(&buf[3..]).unwrap_or(c"");
        if sys.chdir(dir).is_err() {
            fprintln!(sys, 2, "cannot cd {}", crate::text(dir));
        }
        return Builtin::Done;
    }
    if buf.starts_with(b"sh") && matches!(buf[2], b'\n' | b' ') {
        buf[..6].copy_from_slice(&[b's', b'h', b' ', console.digit(), b'\n', 0]);
    }
    Builtin::Run
}
