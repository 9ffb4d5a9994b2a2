//! Telemetry record and partial updates
//!
//! Each acquisition component returns a [`TelemetryUpdate`] instead of
//! writing into shared state. The [`aggregator::TelemetryAggregator`] owns
//! the [`TelemetryRecord`] and applies updates as they arrive; fields that
//! were not refreshed keep their previous value.

pub mod aggregator;
pub mod uplink;

pub use aggregator::TelemetryAggregator;
pub use uplink::{DualUplink, UplinkError, UplinkLine, encode};

use crate::sensors::environment::EnvironmentReadings;
use crate::sensors::tide::TideState;
use crate::sensors::wind_direction::CompassDirection;

/// Snapshot of every sensor-derived field sent on the uplink
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryRecord {
    /// °C
    pub temperature: f32,
    /// %RH
    pub humidity: f32,
    /// Pa
    pub pressure: f32,
    pub wind_speed_mps: f32,
    /// Reserved for wave counting, always 0
    pub wave_count: u32,
    pub wind_direction: CompassDirection,
    pub tide_state: TideState,
}

/// Partial update produced by one acquisition component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryUpdate {
    WindSpeed(f32),
    Tide(TideState),
    WindDirection(CompassDirection),
    Environment(EnvironmentReadings),
}

impl From<EnvironmentReadings> for TelemetryUpdate {
    fn from(readings: EnvironmentReadings) -> Self {
        Self::Environment(readings)
    }
}

impl TelemetryRecord {
    /// Overwrite the fields carried by `update`
    pub fn apply(&mut self, update: TelemetryUpdate) {
        match update {
            TelemetryUpdate::WindSpeed(speed) => self.wind_speed_mps = speed,
            TelemetryUpdate::Tide(state) => self.tide_state = state,
            TelemetryUpdate::WindDirection(direction) => self.wind_direction = direction,
            TelemetryUpdate::Environment(readings) => {
                self.temperature = readings.temperature_celsius;
                self.pressure = readings.pressure_pascal;
                self.humidity = readings.humidity_percent;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_touches_only_carried_fields() {
        let mut record = TelemetryRecord::default();
        record.apply(TelemetryUpdate::WindSpeed(4.2));
        record.apply(TelemetryUpdate::Tide(TideState::Falling));

        assert_eq!(record.wind_speed_mps, 4.2);
        assert_eq!(record.tide_state, TideState::Falling);
        assert_eq!(record.wind_direction, CompassDirection::Unknown);
        assert_eq!(record.temperature, 0.0);

        record.apply(
            EnvironmentReadings {
                temperature_celsius: 29.5,
                pressure_pascal: 100_900.0,
                humidity_percent: 78.0,
            }
            .into(),
        );
        assert_eq!(record.temperature, 29.5);
        assert_eq!(record.pressure, 100_900.0);
        assert_eq!(record.humidity, 78.0);
        // Earlier updates survive
        assert_eq!(record.wind_speed_mps, 4.2);
        assert_eq!(record.wave_count, 0);
    }
}
