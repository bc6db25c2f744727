//! Spinlock that disables interrupts while held.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

/// Interrupt-enable state captured when a lock is taken.
#[derive(Debug, Clone, Copy)]
struct IrqState {
    was_enabled: bool,
}

impl IrqState {
    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    fn save_and_disable() -> Self {
        use x86_64::instructions::interrupts;

        let was_enabled = interrupts::are_enabled();
        interrupts::disable();
        IrqState { was_enabled }
    }

    // Hosted builds have no interrupts to mask.
    #[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
    fn save_and_disable() -> Self {
        IrqState { was_enabled: false }
    }

    fn restore(self) {
        #[cfg(all(target_arch = "x86_64", target_os = "none"))]
        if self.was_enabled {
            x86_64::instructions::interrupts::enable();
        }
        #[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
        let _ = self.was_enabled;
    }
}

/// Mutex that disables interrupts on the local CPU while held.
///
/// Safe to take from both process and interrupt context, as long as no
/// holder blocks or re-enters the interrupt path.
pub struct IrqMutex<T> {
    inner: spin::Mutex<T>,
}

/// Guard of an [`IrqMutex`]; restores the saved interrupt state on drop.
pub struct IrqMutexGuard<'a, T> {
    mutex: &'a IrqMutex<T>,
    guard: ManuallyDrop<spin::MutexGuard<'a, T>>,
    irq: IrqState,
}

impl<T> IrqMutex<T> {
    /// Creates an unlocked mutex.
    pub const fn new(data: T) -> Self {
        Self {
            inner: spin::Mutex::new(data),
        }
    }

    /// Disables interrupts, then spins until the lock is acquired.
    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        let irq = IrqState::save_and_disable();
        let guard = self.inner.lock();
        IrqMutexGuard {
            mutex: self,
            guard: ManuallyDrop::new(guard),
            irq,
        }
    }

    /// Check if the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<'a, T> IrqMutexGuard<'a, T> {
    /// Releases the lock around `f` and re-acquires it afterwards.
    ///
    /// Interrupts stay disabled when `f` starts, so a sleep primitive can
    /// release the lock and block without a window in which a wakeup is
    /// lost. On return interrupts are disabled again before the lock is
    /// retaken; the state saved by [`IrqMutex::lock`] is restored when the
    /// guard finally drops.
    pub fn unlocked<R>(this: &mut Self, f: impl FnOnce() -> R) -> R {
        // SAFETY: `this` is borrowed mutably for the whole call, so nothing
        // can reach the protected data through this guard while the lock is
        // released. The lock is re-acquired before the borrow ends and the
        // guard's drop releases it exactly once.
        unsafe { this.mutex.inner.force_unlock() };
        let result = f();
        let _ = IrqState::save_and_disable();
        core::mem::forget(this.mutex.inner.lock());
        result
    }
}

impl<T> Deref for IrqMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for IrqMutexGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the inner guard is dropped exactly once, here.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.irq.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_and_release() {
        let mutex = IrqMutex::new(1u32);
        {
            let mut guard = mutex.lock();
            *guard += 1;
            assert!(mutex.is_locked());
        }
        assert!(!mutex.is_locked());
        assert_eq!(*mutex.lock(), 2);
    }

    #[test]
    fn test_unlocked_releases_for_the_closure() {
        let mutex = IrqMutex::new(0u32);
        let mut guard = mutex.lock();
        let seen = IrqMutexGuard::unlocked(&mut guard, || {
            // Another context may take the lock while it is released.
            let mut other = mutex.lock();
            *other = 7;
            mutex.is_locked()
        });
        assert!(seen);
        assert!(mutex.is_locked());
        assert_eq!(*guard, 7);
        drop(guard);
        assert!(!mutex.is_locked());
    }
}
