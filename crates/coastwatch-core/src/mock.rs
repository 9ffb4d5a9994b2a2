//! In-memory doubles for serial streams, the edge interrupt and the
//! environmental sensor
//!
//! Used by unit tests and by the desktop simulator (`mock` feature).

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

use crate::sensors::anemometer::EdgeInterrupt;
use crate::sensors::environment::EnvironmentReadings;
use crate::sensors::{Sensor, SensorError};

#[derive(Debug, Default)]
struct MockSerialState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    fail_writes: bool,
    flushes: u32,
}

/// Mock serial port
///
/// Clones share the same buffers, so a test can keep a handle while the
/// station owns another one.
///
/// ```rust,ignore
/// use coastwatch_core::mock::MockSerial;
/// use embedded_io::{Read, Write};
///
/// let mut port = MockSerial::new();
/// let mut handle = port.clone();
///
/// handle.inject_rx(b"*5#");
/// let mut buf = [0u8; 3];
/// assert_eq!(port.read(&mut buf).unwrap(), 3);
///
/// port.write(b"Jawa").unwrap();
/// assert_eq!(handle.tx(), b"Jawa");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    state: Rc<RefCell<MockSerialState>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be read from the port
    pub fn inject_rx(&mut self, data: &[u8]) {
        self.state.borrow_mut().rx.extend(data.iter().copied());
    }

    /// Bytes not yet consumed by a reader
    pub fn rx_pending(&self) -> usize {
        self.state.borrow().rx.len()
    }

    /// Everything written to the port so far
    pub fn tx(&self) -> Vec<u8> {
        self.state.borrow().tx.clone()
    }

    /// Number of `flush` calls on the port
    pub fn flushes(&self) -> u32 {
        self.state.borrow().flushes
    }

    /// Make subsequent writes fail with [`ErrorKind::BrokenPipe`]
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl ErrorType for MockSerial {
    type Error = ErrorKind;
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        let count = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.state.borrow().rx.is_empty())
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(ErrorKind::BrokenPipe);
        }
        state.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().flushes += 1;
        Ok(())
    }
}

/// Edge interrupt double that records enable / disable calls
#[derive(Debug, Default)]
pub struct MockEdgeInterrupt {
    enabled: bool,
    enable_count: u32,
    disable_count: u32,
}

impl MockEdgeInterrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable_count(&self) -> u32 {
        self.enable_count
    }

    pub fn disable_count(&self) -> u32 {
        self.disable_count
    }
}

impl EdgeInterrupt for MockEdgeInterrupt {
    fn enable(&mut self) {
        self.enabled = true;
        self.enable_count += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disable_count += 1;
    }
}

/// Environmental sensor double returning fixed readings
#[derive(Debug, Clone)]
pub struct MockEnvironment {
    pub readings: EnvironmentReadings,
    pub fail: bool,
}

impl MockEnvironment {
    pub fn new(readings: EnvironmentReadings) -> Self {
        Self {
            readings,
            fail: false,
        }
    }
}

impl Sensor for MockEnvironment {
    type Readings = EnvironmentReadings;

    async fn read(&mut self) -> Result<EnvironmentReadings, SensorError> {
        if self.fail {
            return Err(SensorError::ReadFailed {
                sensor: "MockEnvironment",
                operation: "read temperature/pressure/humidity",
                details: "injected failure",
            });
        }
        Ok(self.readings)
    }
}
