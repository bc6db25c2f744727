//! Virtual terminal manager.
//!
//! [`ConsoleDriver`] multiplexes [`NUM_CONSOLES`] logical consoles over one
//! primary text display and one serial mirror. Each console owns a
//! [`TermBuf`] (what it shows) and an [`InputQueue`] (what was typed on it).
//!
//! All state sits behind a single [`IrqMutex`]: output from processes,
//! input from interrupt handlers and blocking reads all serialize on it.
//! Nothing that runs with the lock held may block or log.

mod device;
mod input;
mod mirror;
mod selector;
mod termbuf;

pub use device::{CharDevice, ConsoleDevice};
pub use input::InputQueue;
pub use mirror::SerialMirror;
pub use selector::ConsoleSelector;
pub use termbuf::TermBuf;

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use konsoli_common::console::{BACKSPACE, DELETE, EOF, KILL_LINE, PROC_DUMP};
use konsoli_common::param::NUM_CONSOLES;
use konsoli_common::{ConsoleId, SysError};
use konsoli_hal::{ConsoleChar, Serial, TextDisplay};

use crate::sync::{IrqMutex, IrqMutexGuard, Scheduler, WaitChannel};

/// Everything guarded by the console lock.
struct ConsoleState<D, S> {
    terms: [TermBuf; NUM_CONSOLES],
    inputs: [InputQueue; NUM_CONSOLES],
    mirror: SerialMirror,
    display: D,
    serial: S,
}

impl<D: TextDisplay, S: Serial> ConsoleState<D, S> {
    /// Renders one character of `console` to its grid and both sinks.
    fn put(&mut self, console: ConsoleId, c: ConsoleChar) {
        let term = &mut self.terms[console.index()];
        term.put(c);
        self.mirror.render(term, &mut self.serial);
        self.display.put_char(c);
    }
}

/// Result of feeding one character while the lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fed {
    Edited,
    Committed,
    DumpRequested,
}

/// The multi-console terminal driver.
pub struct ConsoleDriver<D, S> {
    state: IrqMutex<ConsoleState<D, S>>,
    panicked: AtomicBool,
}

impl<D: TextDisplay, S: Serial> ConsoleDriver<D, S> {
    /// Creates the driver with blank consoles and clears the serial screen.
    pub fn new(display: D, mut serial: S) -> Self {
        SerialMirror::clear(&mut serial);
        Self {
            state: IrqMutex::new(ConsoleState {
                terms: core::array::from_fn(|_| TermBuf::new()),
                inputs: core::array::from_fn(|_| InputQueue::new()),
                mirror: SerialMirror::new(),
                display,
                serial,
            }),
            panicked: AtomicBool::new(false),
        }
    }

    fn check_panicked(&self) {
        if self.panicked.load(Ordering::Relaxed) {
            crate::arch::freeze();
        }
    }

    /// Writes one character to `console`.
    pub fn write_char(&self, console: ConsoleId, c: ConsoleChar) {
        let mut state = self.state.lock();
        self.check_panicked();
        state.put(console, c);
    }

    /// Writes `bytes` to `console` in order, under one acquisition of the lock.
    pub fn write(&self, console: ConsoleId, bytes: &[u8]) -> usize {
        let mut state = self.state.lock();
        for &byte in bytes {
            self.check_panicked();
            state.put(console, ConsoleChar::Byte(byte));
        }
        bytes.len()
    }

    /// Formats `args` onto `console`.
    pub fn print(&self, console: ConsoleId, args: fmt::Arguments) {
        let mut state = self.state.lock();
        let mut writer = ConsoleWriter {
            driver: self,
            state: &mut state,
            console,
        };
        let _ = fmt::Write::write_fmt(&mut writer, args);
    }

    /// Stops all further output; any later write freezes the CPU.
    pub fn mark_panicked(&self) {
        self.panicked.store(true, Ordering::Relaxed);
    }

    /// Feeds one typed character into `console`'s line discipline.
    pub fn feed<Sc: Scheduler>(&self, sched: &Sc, console: ConsoleId, c: u8) {
        self.feed_all(sched, console, [c]);
    }

    /// Feeds a burst of typed characters under one acquisition of the lock.
    ///
    /// A process-listing request is served after the lock is released.
    pub fn feed_all<Sc, I>(&self, sched: &Sc, console: ConsoleId, input: I)
    where
        Sc: Scheduler,
        I: IntoIterator<Item = u8>,
    {
        let mut dump = false;
        {
            let mut state = self.state.lock();
            for c in input {
                match self.edit(&mut state, console, c) {
                    Fed::DumpRequested => dump = true,
                    Fed::Committed => sched.wakeup(WaitChannel::console_input(console)),
                    Fed::Edited => {}
                }
            }
        }
        if dump {
            sched.procdump();
        }
    }

    fn edit(&self, state: &mut ConsoleState<D, S>, console: ConsoleId, c: u8) -> Fed {
        match c {
            PROC_DUMP => Fed::DumpRequested,
            KILL_LINE => {
                while state.inputs[console.index()].erase_in_line() {
                    self.check_panicked();
                    state.put(console, ConsoleChar::Backspace);
                }
                Fed::Edited
            }
            BACKSPACE | DELETE => {
                if state.inputs[console.index()].erase() {
                    self.check_panicked();
                    state.put(console, ConsoleChar::Backspace);
                }
                Fed::Edited
            }
            0 => Fed::Edited,
            c if state.inputs[console.index()].has_room() => {
                let c = if c == b'\r' { b'\n' } else { c };
                state.inputs[console.index()].push(c);
                self.check_panicked();
                state.put(console, ConsoleChar::Byte(c));
                let input = &mut state.inputs[console.index()];
                if c == b'\n' || c == EOF || input.is_full() {
                    input.commit();
                    Fed::Committed
                } else {
                    Fed::Edited
                }
            }
            // Queue full: dropped without echo.
            _ => Fed::Edited,
        }
    }

    /// Reads committed input from `console` into `dst`.
    ///
    /// Blocks until something is committed. Returns after a newline
    /// (included in the result), after `dst` is full, or at an end-of-input
    /// mark. The mark itself is never copied: met first it yields `Ok(0)`,
    /// met later it is left in the queue for the next call.
    pub fn read<Sc: Scheduler>(
        &self,
        sched: &Sc,
        console: ConsoleId,
        dst: &mut [u8],
    ) -> Result<usize, SysError> {
        let chan = WaitChannel::console_input(console);
        let mut state = self.state.lock();
        let mut n = 0;
        while n < dst.len() {
            while !state.inputs[console.index()].readable() {
                if sched.killed() {
                    return Err(SysError::Killed);
                }
                sched.sleep(chan, &mut state);
            }
            let input = &mut state.inputs[console.index()];
            let c = input.pop();
            if c == EOF {
                if n > 0 {
                    input.unpop();
                }
                break;
            }
            dst[n] = c;
            n += 1;
            if c == b'\n' {
                break;
            }
        }
        Ok(n)
    }

    /// Cursor and queue state of `console`, for diagnostics.
    pub fn status(&self, console: ConsoleId) -> ConsoleStatus {
        let state = self.state.lock();
        let term = &state.terms[console.index()];
        ConsoleStatus {
            console,
            cursor: term.cursor(),
            top_y: term.top_y(),
            rows_used: term.rows_used(),
            input: state.inputs[console.index()].indices(),
        }
    }

    /// Runs `f` with the console lock held. Test-only window into the state.
    #[cfg(test)]
    fn inspect<R>(&self, f: impl FnOnce(&[TermBuf], &[InputQueue]) -> R) -> R {
        let state = self.state.lock();
        f(&state.terms, &state.inputs)
    }
}

/// `fmt::Write` adapter over a locked console.
struct ConsoleWriter<'a, 'g, D, S> {
    driver: &'a ConsoleDriver<D, S>,
    state: &'a mut IrqMutexGuard<'g, ConsoleState<D, S>>,
    console: ConsoleId,
}

impl<D: TextDisplay, S: Serial> fmt::Write for ConsoleWriter<'_, '_, D, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.driver.check_panicked();
            self.state.put(self.console, ConsoleChar::Byte(byte));
        }
        Ok(())
    }
}

/// Snapshot of one console, printed by the process-listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleStatus {
    /// Which console.
    pub console: ConsoleId,
    /// Cursor `(x, y)`.
    pub cursor: (usize, usize),
    /// First visible row of the ring.
    pub top_y: usize,
    /// Rows written so far.
    pub rows_used: usize,
    /// Input `(read, write, edit)` counters.
    pub input: (usize, usize, usize),
}

impl fmt::Display for ConsoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, w, e) = self.input;
        write!(
            f,
            "console{}: cursor {},{} top {} rows {} input r={} w={} e={}",
            self.console, self.cursor.0, self.cursor.1, self.top_y, self.rows_used, r, w, e
        )
    }
}
