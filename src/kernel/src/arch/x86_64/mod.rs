//! x86_64 architecture support.
//!
//! CGA text display, COM1 serial port and PS/2 keyboard decoding. With the
//! `image` feature, also the interrupt wiring and boot glue.

pub mod keyboard;
pub mod serial;
pub mod vga;

#[cfg(feature = "image")]
pub mod interrupts;
#[cfg(feature = "image")]
pub mod machine;

/// Halts the CPU until the next interrupt.
///
/// Used in idle loops to reduce power consumption.
#[inline]
pub fn hlt() {
    x86_64::instructions::hlt();
}

/// Halts the CPU in an infinite loop.
///
/// Used after unrecoverable errors (panics).
pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}
