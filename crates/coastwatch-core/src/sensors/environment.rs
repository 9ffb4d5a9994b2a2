//! Temperature / pressure / humidity sensor interface
//!
//! The station treats its BME280-class sensor as a black box returning three
//! readings. Any driver implementing [`Sensor`] with
//! [`EnvironmentReadings`] plugs in.

use super::{Sensor, SensorError};

/// Typed readings from the environmental sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvironmentReadings {
    pub temperature_celsius: f32,
    pub pressure_pascal: f32,
    pub humidity_percent: f32,
}

/// Any sensor producing [`EnvironmentReadings`]
pub trait EnvironmentSensor: Sensor<Readings = EnvironmentReadings> {}

impl<S> EnvironmentSensor for S where S: Sensor<Readings = EnvironmentReadings> {}

/// Placeholder for stations built without an environmental sensor.
///
/// Reads always fail, so the temperature, pressure and humidity fields keep
/// their initial values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFitted;

impl Sensor for NotFitted {
    type Readings = EnvironmentReadings;

    async fn read(&mut self) -> Result<EnvironmentReadings, SensorError> {
        Err(SensorError::ReadFailed {
            sensor: "environment",
            operation: "read temperature/pressure/humidity",
            details: "sensor not fitted",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_fitted_always_fails() {
        let mut sensor = NotFitted;
        let result = embassy_futures::block_on(sensor.read());
        assert!(matches!(result, Err(SensorError::ReadFailed { .. })));
    }
}
