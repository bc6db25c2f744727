//! Sleep/wakeup seam between the console driver and the process layer.

use konsoli_common::ConsoleId;

use super::IrqMutexGuard;

/// Identifies what a sleeping process is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitChannel(usize);

impl WaitChannel {
    /// Channel signalled when input is committed on `console`.
    pub const fn console_input(console: ConsoleId) -> Self {
        WaitChannel(console.index())
    }
}

/// Process-layer services the console driver depends on.
pub trait Scheduler {
    /// Atomically releases `guard`'s lock and blocks the caller on `chan`.
    ///
    /// The lock is held again when this returns. A wakeup issued after the
    /// caller checked its condition but before it blocked must not be lost.
    /// Spurious returns are allowed; callers re-check their condition.
    fn sleep<T>(&self, chan: WaitChannel, guard: &mut IrqMutexGuard<'_, T>);

    /// Makes every process sleeping on `chan` runnable.
    fn wakeup(&self, chan: WaitChannel);

    /// Whether the calling process has been asked to terminate.
    fn killed(&self) -> bool;

    /// Prints a process listing. Called without the console lock held.
    fn procdump(&self);
}
