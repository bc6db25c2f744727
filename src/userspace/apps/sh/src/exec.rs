//! Runs a command tree as a tree of processes.

use core::ffi::CStr;

use konsoli_sdk::{fprintln, System};

use crate::parser::Command;
use crate::text;

/// Runs `cmd` in the calling process and returns the status it should exit
/// with.
///
/// Redirections rewrite the caller's own descriptor table, and an `Exec`
/// replaces the caller, so this is only ever called in a process that
/// exits right after.
pub fn run<S: System>(sys: &mut S, cmd: &Command<&CStr>) -> i32 {
    match cmd {
        Command::Exec { argv } => {
            let Some(&name) = argv.first() else {
                return 0;
            };
            match sys.exec(name, argv) {
                Ok(status) => status,
                Err(_) => {
                    fprintln!(sys, 2, "exec {} failed", text(name));
                    1
                }
            }
        }
        Command::Redirect {
            inner,
            path,
            mode,
            fd,
        } => {
            let _ = sys.close(*fd);
            if sys.open(path, mode.flags()).is_err() {
                fprintln!(sys, 2, "open {} failed", text(path));
                return 1;
            }
            run(sys, inner)
        }
        Command::RedirectFd {
            inner,
            source,
            target,
        } => {
            if source != target {
                let _ = sys.close(*target);
                if sys.dup(*source).is_err() {
                    fprintln!(sys, 2, "invalid redir fd");
                    return 1;
                }
            }
            run(sys, inner)
        }
        Command::List { first, second } => {
            if !spawn(sys, first) {
                return 1;
            }
            let _ = sys.wait();
            run(sys, second)
        }
        Command::Pipe { left, right } => {
            let Ok((read, write)) = sys.pipe() else {
                fprintln!(sys, 2, "pipe");
                return 1;
            };
            let writer = sys.fork(|sys| {
                let _ = sys.close(1);
                let _ = sys.dup(write);
                let _ = sys.close(read);
                let _ = sys.close(write);
                run(sys, left)
            });
            let reader = writer.and_then(|_| {
                sys.fork(|sys| {
                    let _ = sys.close(0);
                    let _ = sys.dup(read);
                    let _ = sys.close(read);
                    let _ = sys.close(write);
                    run(sys, right)
                })
            });
            if reader.is_err() {
                fprintln!(sys, 2, "fork");
                return 1;
            }
            let _ = sys.close(read);
            let _ = sys.close(write);
            let _ = sys.wait();
            let _ = sys.wait();
            0
        }
        Command::Background { inner } => {
            if spawn(sys, inner) {
                0
            } else {
                1
            }
        }
    }
}

/// Forks a child that runs `cmd`. Returns whether the fork succeeded.
fn spawn<S: System>(sys: &mut S, cmd: &Command<&CStr>) -> bool {
    if sys.fork(|sys| run(sys, cmd)).is_err() {
        fprintln!(sys, 2, "fork");
        return false;
    }
    true
}
