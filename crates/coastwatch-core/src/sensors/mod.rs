//! Sensor drivers and parsers
//!
//! - [`anemometer`]: interrupt-driven pulse-rate wind speed sampling
//! - [`tide`]: checksummed 4-byte ultrasonic distance frames
//! - [`wind_direction`]: `*<code>#` delimited compass tokens
//! - [`environment`]: temperature / pressure / humidity sensor interface

pub mod anemometer;
pub mod environment;
pub mod tide;
pub mod wind_direction;

pub use anemometer::{Anemometer, EdgeInterrupt, EdgeLatch};
pub use environment::{EnvironmentReadings, EnvironmentSensor, NotFitted};
pub use tide::{TideSensor, TideState};
pub use wind_direction::{CompassDirection, WindDirectionSensor};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation} ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: serial stream error ({kind:?})")]
    Stream {
        sensor: &'static str,
        kind: embedded_io::ErrorKind,
    },
}

impl SensorError {
    /// Wrap a serial stream error for the named sensor
    pub fn stream<E: embedded_io::Error>(sensor: &'static str, error: E) -> Self {
        Self::Stream {
            sensor,
            kind: error.kind(),
        }
    }
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Readings;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}
