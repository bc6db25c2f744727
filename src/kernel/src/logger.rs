//! Kernel logger.
//!
//! Implements `log::Log` by printing each record onto the selected console,
//! the way the rest of the kernel's diagnostics reach the user.

use core::fmt;

use konsoli_hal::{Serial, TextDisplay};
use log::{LevelFilter, Metadata, Record};

use crate::console::{ConsoleDriver, ConsoleSelector};

/// Destination of formatted log lines.
pub trait LogSink: Sync {
    /// Writes one complete line, newline included.
    fn write_line(&self, args: fmt::Arguments);
}

/// Log output onto whichever console currently has the keyboard.
pub struct SelectedConsole<D: 'static, S: 'static> {
    driver: &'static ConsoleDriver<D, S>,
    selector: &'static ConsoleSelector,
}

impl<D, S> SelectedConsole<D, S> {
    /// Logs through `driver` onto the console chosen by `selector`.
    pub const fn new(driver: &'static ConsoleDriver<D, S>, selector: &'static ConsoleSelector) -> Self {
        Self { driver, selector }
    }
}

impl<D, S> LogSink for SelectedConsole<D, S>
where
    D: TextDisplay + Send,
    S: Serial + Send,
{
    fn write_line(&self, args: fmt::Arguments) {
        self.driver.print(self.selector.current(), args);
    }
}

/// `log::Log` front end over a [`LogSink`].
struct ConsoleLogger {
    sink: spin::Once<&'static dyn LogSink>,
}

impl ConsoleLogger {
    const fn new() -> Self {
        Self {
            sink: spin::Once::new(),
        }
    }
}

/// Global logger instance
static LOGGER: ConsoleLogger = ConsoleLogger::new();

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(sink) = self.sink.get() {
            sink.write_line(format_args!("[{:<5}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Initialize the logger.
///
/// Records are dropped until this runs. Must never be called, and nothing
/// may log, while the console lock is held.
pub fn init(sink: &'static dyn LogSink, max_level: LevelFilter) {
    LOGGER.sink.call_once(|| sink);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(max_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};
    use std::sync::Mutex;

    struct Lines(Mutex<String>);

    impl LogSink for Lines {
        fn write_line(&self, args: fmt::Arguments) {
            self.0.lock().unwrap().push_str(&args.to_string());
        }
    }

    #[test]
    fn test_record_format() {
        let lines: &'static Lines = Box::leak(Box::new(Lines(Mutex::new(String::new()))));
        let logger = ConsoleLogger::new();
        logger.sink.call_once(|| lines as &'static dyn LogSink);
        log::set_max_level(LevelFilter::Info);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("console {} selected", 2))
                .build(),
        );
        logger.log(&Record::builder().level(Level::Trace).args(format_args!("noise")).build());

        assert_eq!(*lines.0.lock().unwrap(), "[INFO ] console 2 selected\n");
    }
}
