//! One shell per console, restarted whenever it exits.

use core::fmt;

use konsoli_common::console::{ConsoleId, CONSOLE_MAJOR};
use konsoli_common::fcntl::OpenFlags;
use konsoli_common::param::NUM_CONSOLES;
use konsoli_common::SysError;
use konsoli_sdk::{fprintln, Fd, Pid, System};

/// Why the supervisor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperviseError {
    /// A console device could not be opened or created.
    Provision {
        /// The console.
        console: ConsoleId,
        /// What failed.
        err: SysError,
    },
    /// A console device landed on the wrong descriptor.
    DescriptorMismatch {
        /// The console.
        console: ConsoleId,
        /// Where it should be.
        expected: Fd,
        /// Where it ended up.
        actual: Fd,
    },
    /// A shell could not be forked.
    Fork(SysError),
    /// There was nothing left to wait for.
    Wait(SysError),
}

impl fmt::Display for SuperviseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuperviseError::Provision { console, err } => {
                write!(f, "cannot open {}: {}", console.device_name().as_str(), err)
            }
            SuperviseError::DescriptorMismatch {
                console,
                expected,
                actual,
            } => write!(
                f,
                "{} opened on fd {}, expected {}",
                console.device_name().as_str(),
                actual,
                expected
            ),
            SuperviseError::Fork(_) => write!(f, "fork failed"),
            SuperviseError::Wait(err) => write!(f, "wait failed: {}", err),
        }
    }
}

/// Shell slots, one per console.
#[derive(Debug, Default)]
pub struct Supervisor {
    slots: [Option<Pid>; NUM_CONSOLES],
}

impl Supervisor {
    /// A supervisor with no shells running.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shell currently running on `console`.
    pub fn slot(&self, console: ConsoleId) -> Option<Pid> {
        self.slots[console.index()]
    }

    /// Sets up the descriptor convention: the first console on 0, 1 and 2,
    /// then console `i` on `3 + i`. Device nodes are created as needed.
    pub fn provision<S: System>(&mut self, sys: &mut S) -> Result<(), SuperviseError> {
        for expected in 0..3 {
            open_console(sys, ConsoleId::FIRST, expected)?;
        }
        for console in ConsoleId::all() {
            open_console(sys, console, console.fd())?;
        }
        Ok(())
    }

    /// Starts a shell on every console without one, then reaps one child.
    pub fn step<S: System>(&mut self, sys: &mut S) -> Result<(), SuperviseError> {
        for console in ConsoleId::all() {
            if self.slots[console.index()].is_none() {
                fprintln!(sys, 1, "init: starting sh on console {}", console);
                let pid = sys
                    .fork(|sys| shell(sys, console))
                    .map_err(SuperviseError::Fork)?;
                self.slots[console.index()] = Some(pid);
            }
        }

        let pid = sys.wait().map_err(SuperviseError::Wait)?;
        match self.slots.iter_mut().find(|slot| **slot == Some(pid)) {
            Some(slot) => *slot = None,
            None => fprintln!(sys, 1, "init: zombie!"),
        }
        Ok(())
    }

    /// Supervises until something goes wrong.
    pub fn run<S: System>(&mut self, sys: &mut S) -> SuperviseError {
        loop {
            if let Err(err) = self.step(sys) {
                return err;
            }
        }
    }
}

fn open_console<S: System>(
    sys: &mut S,
    console: ConsoleId,
    expected: Fd,
) -> Result<(), SuperviseError> {
    let name = console.device_name();
    let path = name.as_c_str();
    let fd = match sys.open(path, OpenFlags::RDWR) {
        Ok(fd) => fd,
        Err(_) => {
            let minor = console.index() as u16;
            sys.mknod(path, CONSOLE_MAJOR, minor)
                .and_then(|()| sys.open(path, OpenFlags::RDWR))
                .map_err(|err| SuperviseError::Provision { console, err })?
        }
    };
    if fd != expected {
        return Err(SuperviseError::DescriptorMismatch {
            console,
            expected,
            actual: fd,
        });
    }
    Ok(())
}

/// Body of a freshly forked shell process.
fn shell<S: System>(sys: &mut S, console: ConsoleId) -> i32 {
    for fd in 0..3 {
        let _ = sys.close(fd);
    }
    for _ in 0..3 {
        let _ = sys.dup(console.fd());
    }
    let arg = console.arg();
    match sys.exec(c"sh", &[c"sh", arg.as_c_str()]) {
        Ok(status) => status,
        Err(_) => {
            fprintln!(sys, 1, "init: exec sh failed");
            1
        }
    }
}
