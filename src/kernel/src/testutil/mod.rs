//! Host-side fakes for exercising the console driver.
//!
//! The recording sinks are cheap handles onto shared buffers: clone one
//! into the driver and keep the other to inspect what was rendered.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use konsoli_hal::{ConsoleChar, Serial, TextDisplay};

use crate::sync::{IrqMutexGuard, Scheduler, WaitChannel};

/// Serial sink that records every byte.
#[derive(Clone, Default)]
pub struct RecordingSerial {
    out: Rc<RefCell<Vec<u8>>>,
}

impl RecordingSerial {
    /// An empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears everything written so far.
    pub fn take(&self) -> Vec<u8> {
        self.out.take()
    }
}

impl Serial for RecordingSerial {
    fn write_byte(&mut self, byte: u8) {
        self.out.borrow_mut().push(byte);
    }

    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}

/// Display sink that records every character.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    out: Rc<RefCell<Vec<ConsoleChar>>>,
}

impl RecordingDisplay {
    /// An empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears everything rendered so far.
    pub fn take(&self) -> Vec<ConsoleChar> {
        self.out.take()
    }
}

impl TextDisplay for RecordingDisplay {
    fn put_char(&mut self, c: ConsoleChar) {
        self.out.borrow_mut().push(c);
    }
}

type SleepAction<'a> = Box<dyn FnOnce(&ScriptedScheduler<'a>) + 'a>;

/// Scheduler driven by a script of things that happen while a reader sleeps.
///
/// Each sleep runs the next scripted action with the lock released. When the
/// script is exhausted the sleeper is marked killed, so a read that would
/// block forever returns `Err(Killed)` instead.
#[derive(Default)]
pub struct ScriptedScheduler<'a> {
    actions: RefCell<VecDeque<SleepAction<'a>>>,
    on_procdump: RefCell<Option<Box<dyn Fn() + 'a>>>,
    killed: Cell<bool>,
    sleeps: Cell<usize>,
    procdumps: Cell<usize>,
    wakeups: RefCell<Vec<WaitChannel>>,
}

impl<'a> ScriptedScheduler<'a> {
    /// A scheduler with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `action` to run during the next unscripted sleep.
    pub fn on_sleep(&self, action: impl FnOnce(&ScriptedScheduler<'a>) + 'a) {
        self.actions.borrow_mut().push_back(Box::new(action));
    }

    /// Runs `f` on every process-listing request.
    pub fn on_procdump(&self, f: impl Fn() + 'a) {
        *self.on_procdump.borrow_mut() = Some(Box::new(f));
    }

    /// Number of sleeps so far.
    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }

    /// Number of process-listing requests so far.
    pub fn procdumps(&self) -> usize {
        self.procdumps.get()
    }

    /// Channels woken so far, in order.
    pub fn wakeups(&self) -> Vec<WaitChannel> {
        self.wakeups.borrow().clone()
    }
}

impl Scheduler for ScriptedScheduler<'_> {
    fn sleep<T>(&self, _chan: WaitChannel, guard: &mut IrqMutexGuard<'_, T>) {
        self.sleeps.set(self.sleeps.get() + 1);
        let action = self.actions.borrow_mut().pop_front();
        match action {
            Some(action) => IrqMutexGuard::unlocked(guard, || action(self)),
            None => self.killed.set(true),
        }
    }

    fn wakeup(&self, chan: WaitChannel) {
        self.wakeups.borrow_mut().push(chan);
    }

    fn killed(&self) -> bool {
        self.killed.get()
    }

    fn procdump(&self) {
        self.procdumps.set(self.procdumps.get() + 1);
        if let Some(f) = self.on_procdump.borrow().as_ref() {
            f();
        }
    }
}
