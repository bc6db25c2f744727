//! konsoli kernel entry point.
//!
//! Boots the console subsystem and runs a line monitor on whichever
//! console has the keyboard: every committed line is echoed back.

#![no_std]
#![no_main]

use bootloader::{entry_point, BootInfo};
use core::panic::PanicInfo;
use konsoli_common::{ConsoleId, SysError};
use konsoli_kernel::arch::x86_64::machine::{self, HaltScheduler, SELECTOR};
use konsoli_kernel::console::{CharDevice, ConsoleDevice};

entry_point!(kernel_main);

/// Kernel entry point.
///
/// Called by the bootloader after setting up the initial environment.
fn kernel_main(_boot_info: &'static BootInfo) -> ! {
    konsoli_kernel::init();

    let driver = machine::console();
    for console in ConsoleId::all() {
        driver.print(
            console,
            format_args!("konsoli v{} - console {}\n", env!("CARGO_PKG_VERSION"), console),
        );
    }
    log::info!("F1-F4 switch consoles, ^P lists console state");

    let mut line = [0u8; 128];
    loop {
        let console = SELECTOR.current();
        let sched = HaltScheduler::for_console(console);
        let device = ConsoleDevice::new(driver, &sched);
        let minor = console.index() as u16;

        driver.print(console, format_args!("{}> ", console));
        match device.read(minor, &mut line) {
            Ok(0) => {
                let _ = device.write(minor, b"^D\n");
            }
            Ok(n) => {
                let _ = device.write(minor, &line[..n]);
            }
            // Input moved to another console.
            Err(SysError::Killed) => {
                driver.print(console, format_args!("\n"));
            }
            Err(err) => log::warn!("console {}: read failed: {}", console, err),
        }
    }
}

/// Panic handler.
///
/// Called when the kernel encounters an unrecoverable error.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    machine::panic(info)
}
