//! COM1, the serial side of the console.
//!
//! The console driver renders its mirror through [`Uart`], and bytes typed
//! on the serial terminal arrive through the receive interrupt. Reports
//! from the panic and exception paths use [`emergency_print`], which never
//! waits for a lock.

use core::fmt::{self, Write};

use konsoli_hal::Serial;
use spin::Mutex;
use uart_16550::SerialPort;

/// COM1 I/O port address.
const COM1_PORT: u16 = 0x3F8;

static COM1: spin::Once<Mutex<SerialPort>> = spin::Once::new();

fn port() -> &'static Mutex<SerialPort> {
    COM1.call_once(|| {
        // SAFETY: COM1 is the standard PC serial port; only this module
        // touches its registers. `init` also turns on the receive interrupt.
        let mut port = unsafe { SerialPort::new(COM1_PORT) };
        port.init();
        Mutex::new(port)
    })
}

/// The UART as a console sink.
#[derive(Debug)]
pub struct Uart(());

impl Uart {
    /// Initializes COM1 on first use and returns a handle to it.
    pub fn take() -> Self {
        port();
        Uart(())
    }
}

impl Serial for Uart {
    fn write_byte(&mut self, byte: u8) {
        port().lock().send_raw(byte);
    }

    fn read_byte(&mut self) -> Option<u8> {
        port().lock().try_receive().ok()
    }
}

/// Prints straight to COM1, breaking the port lock if it is held.
///
/// Only for code that may have interrupted a holder of the lock and will
/// never return to it.
pub fn emergency_print(args: fmt::Arguments) {
    let port = port();
    if port.is_locked() {
        // SAFETY: the holder was interrupted for good; at worst one of its
        // bytes interleaves with this report.
        unsafe { port.force_unlock() };
    }
    let _ = port.lock().write_fmt(args);
}
