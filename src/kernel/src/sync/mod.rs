//! Synchronization primitives for the console subsystem.
//!
//! The console driver is entered both from process context (device read and
//! write) and from interrupt handlers (keyboard and serial input). Both paths
//! serialize on one [`IrqMutex`], which keeps interrupts off on the local CPU
//! while held so an input interrupt can never spin on a lock its own CPU owns.
//!
//! Blocking is delegated to a [`Scheduler`]: a reader that finds nothing to
//! consume sleeps on a [`WaitChannel`] and the input path wakes it.

mod irq_mutex;
mod sleep;

pub use irq_mutex::{IrqMutex, IrqMutexGuard};
pub use sleep::{Scheduler, WaitChannel};
