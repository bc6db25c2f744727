//! Character-device face of the console driver.
//!
//! The file layer dispatches reads and writes on a console device node to
//! here, keyed by the node's minor number.

use konsoli_common::{ConsoleId, SysError};
use konsoli_hal::{Serial, TextDisplay};

use super::ConsoleDriver;
use crate::sync::Scheduler;

/// A device addressed by major number whose units are told apart by minor.
pub trait CharDevice {
    /// Reads into `dst` from unit `minor`, returning the byte count.
    fn read(&self, minor: u16, dst: &mut [u8]) -> Result<usize, SysError>;
    /// Writes `src` to unit `minor`, returning the byte count.
    fn write(&self, minor: u16, src: &[u8]) -> Result<usize, SysError>;
}

/// The console driver bound to the scheduler of the calling process.
pub struct ConsoleDevice<'a, D, S, Sc> {
    driver: &'a ConsoleDriver<D, S>,
    sched: &'a Sc,
}

impl<'a, D, S, Sc> ConsoleDevice<'a, D, S, Sc> {
    /// Binds `driver` to `sched` for the duration of one request.
    pub fn new(driver: &'a ConsoleDriver<D, S>, sched: &'a Sc) -> Self {
        Self { driver, sched }
    }
}

fn unit(minor: u16) -> Result<ConsoleId, SysError> {
    ConsoleId::new(usize::from(minor)).ok_or(SysError::NotFound)
}

impl<D: TextDisplay, S: Serial, Sc: Scheduler> CharDevice for ConsoleDevice<'_, D, S, Sc> {
    fn read(&self, minor: u16, dst: &mut [u8]) -> Result<usize, SysError> {
        self.driver.read(self.sched, unit(minor)?, dst)
    }

    fn write(&self, minor: u16, src: &[u8]) -> Result<usize, SysError> {
        Ok(self.driver.write(unit(minor)?, src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingDisplay, RecordingSerial, ScriptedScheduler};

    #[test]
    fn test_minor_selects_console() {
        let driver = ConsoleDriver::new(RecordingDisplay::new(), RecordingSerial::new());
        let sched = ScriptedScheduler::new();
        let device = ConsoleDevice::new(&driver, &sched);

        assert_eq!(device.write(2, b"hey"), Ok(3));
        assert_eq!(driver.status(ConsoleId::new(2).unwrap()).cursor, (3, 0));
        assert_eq!(driver.status(ConsoleId::FIRST).cursor, (0, 0));

        driver.feed_all(&sched, ConsoleId::new(1).unwrap(), *b"in\n");
        let mut buf = [0u8; 8];
        assert_eq!(device.read(1, &mut buf), Ok(3));
        assert_eq!(&buf[..3], b"in\n");
    }

    #[test]
    fn test_unknown_minor() {
        let driver = ConsoleDriver::new(RecordingDisplay::new(), RecordingSerial::new());
        let sched = ScriptedScheduler::new();
        let device = ConsoleDevice::new(&driver, &sched);
        assert_eq!(device.write(9, b"x"), Err(SysError::NotFound));
        assert_eq!(device.read(9, &mut [0u8; 1]), Err(SysError::NotFound));
    }
}
