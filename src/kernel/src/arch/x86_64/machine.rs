//! Boot-time wiring of the console subsystem on a bare x86_64 machine.
//!
//! Owns the global [`ConsoleDriver`] over the CGA display and COM1, the
//! input selector, and the halt-based scheduler used by the built-in
//! monitor in place of a process layer.

use core::fmt::{self, Write};
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

use konsoli_common::ConsoleId;
use konsoli_hal::{ConsoleChar, Serial, TextDisplay};
use log::LevelFilter;
use x86_64::instructions::interrupts;

use super::keyboard::{decode_scancode, KeyInput};
use super::serial::{self, Uart};
use super::vga::CgaDisplay;
use crate::console::{ConsoleDriver, ConsoleSelector};
use crate::logger::{self, SelectedConsole};
use crate::sync::{IrqMutexGuard, Scheduler, WaitChannel};

/// The console driver as wired on this machine.
pub type KernelConsole = ConsoleDriver<CgaDisplay, Uart>;

static CONSOLE: spin::Once<KernelConsole> = spin::Once::new();

static LOG_SINK: spin::Once<SelectedConsole<CgaDisplay, Uart>> = spin::Once::new();

/// Console that keyboard and serial input go to.
pub static SELECTOR: ConsoleSelector = ConsoleSelector::new();

/// Returns the console driver, creating it on first use.
pub fn console() -> &'static KernelConsole {
    CONSOLE.call_once(|| {
        // SAFETY: the only CGA handle outside the panic path.
        let display = unsafe { CgaDisplay::new() };
        ConsoleDriver::new(display, Uart::take())
    })
}

/// Brings up the consoles, logging and interrupts.
pub fn init() {
    let driver = console();
    let sink = LOG_SINK.call_once(|| SelectedConsole::new(driver, &SELECTOR));
    logger::init(sink, LevelFilter::Info);
    log::info!("console driver ready");
    super::interrupts::init();
    log::info!("keyboard and COM1 interrupts enabled");
}

/// Blocks by halting until the next interrupt.
///
/// There is one reader, the monitor, and it reads the selected console;
/// it counts as killed once the selection moves elsewhere.
pub struct HaltScheduler {
    console: ConsoleId,
}

impl HaltScheduler {
    /// Scheduler for a reader of `console`.
    pub fn for_console(console: ConsoleId) -> Self {
        Self { console }
    }
}

impl Scheduler for HaltScheduler {
    fn sleep<T>(&self, _chan: WaitChannel, guard: &mut IrqMutexGuard<'_, T>) {
        // Interrupts are still off here; `sti; hlt` cannot miss the wakeup.
        IrqMutexGuard::unlocked(guard, interrupts::enable_and_hlt);
    }

    fn wakeup(&self, _chan: WaitChannel) {}

    fn killed(&self) -> bool {
        SELECTOR.current() != self.console
    }

    fn procdump(&self) {
        let driver = console();
        for console in ConsoleId::all() {
            log::info!("{}", driver.status(console));
        }
    }
}

/// Keyboard interrupt body.
pub fn keyboard_input(scancode: u8) {
    match decode_scancode(scancode) {
        Some(KeyInput::Char(c)) => {
            let target = SELECTOR.current();
            console().feed(&HaltScheduler::for_console(target), target, c);
        }
        Some(KeyInput::Switch(target)) => {
            if SELECTOR.select(target) {
                log::info!("input switched to console {}", target);
            }
        }
        None => {}
    }
}

/// COM1 receive interrupt body.
pub fn serial_input() {
    let target = SELECTOR.current();
    let sched = HaltScheduler::for_console(target);
    let mut uart = Uart::take();
    while let Some(byte) = uart.read_byte() {
        console().feed(&sched, target, byte);
    }
}

static PANICKING: AtomicBool = AtomicBool::new(false);

struct PanicScreen(CgaDisplay);

impl Write for PanicScreen {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.0.put_char(ConsoleChar::Byte(byte));
        }
        Ok(())
    }
}

/// Reports a kernel panic on both sinks, freezes the consoles and halts.
///
/// Writes around the console driver, whose lock may be held by the
/// panicking code.
pub fn panic(info: &PanicInfo) -> ! {
    interrupts::disable();
    if !PANICKING.swap(true, Ordering::SeqCst) {
        serial::emergency_print(format_args!("KERNEL PANIC: {}\n", info));
        if let Some(driver) = CONSOLE.get() {
            driver.mark_panicked();
        }
        // SAFETY: interrupts are off and the console is frozen; nothing else
        // touches the CGA buffer from here on.
        let mut screen = PanicScreen(unsafe { CgaDisplay::new() });
        let _ = writeln!(screen, "\npanic: {}", info);
    }
    super::halt_loop()
}
