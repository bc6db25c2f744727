//! Architecture-specific implementations.
//!
//! This module provides platform abstractions for different target architectures.
//! Currently supported: x86_64.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

/// Stops this CPU for good, with interrupts off.
///
/// Used once the system has panicked and any further output would be
/// unreliable.
pub fn freeze() -> ! {
    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    {
        ::x86_64::instructions::interrupts::disable();
        self::x86_64::halt_loop()
    }
    #[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
    loop {
        core::hint::spin_loop();
    }
}
