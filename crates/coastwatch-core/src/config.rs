//! Station configuration
//!
//! All tunables are compile-time constants. [`StationConfig`] groups them so
//! the firmware and simulator can hand a single value to [`crate::Station`];
//! its `Default` is exactly the constants below.

use embassy_time::Duration;

use crate::feasibility::FeasibilityThresholds;
use crate::sensors::anemometer::{AnemometerSettings, Calibration};

/// Station identifier used when the build does not provide one
pub const DEFAULT_STATION_ID: &str = "Jawa";

/// Minimum spacing between two accepted anemometer edges
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(5);

/// Length of the anemometer pulse integration window
pub const ANEMOMETER_WINDOW: Duration = Duration::from_secs(10);

/// Calibration polynomial `a·r² + b·r + c` (r = rotations per second)
pub const CALIBRATION_A: f32 = -0.0181;
pub const CALIBRATION_B: f32 = 1.3859;
pub const CALIBRATION_C: f32 = 1.4055;

/// The cup anemometer cannot resolve speeds at or below this value [m/s]
pub const WIND_SPEED_NOISE_FLOOR: f32 = 1.5;

/// Water distance below which the tide is considered rising [mm]
pub const TIDE_THRESHOLD_MM: u16 = 500;

/// Without a valid tide frame for this long, the tide state becomes unknown
pub const TIDE_STALE_AFTER: Duration = Duration::from_secs(30);

/// Wind speed above which sailing is unsafe [m/s]
pub const MAX_WIND_SPEED: f32 = 10.0;

/// Uplink broadcast cadence
pub const TRANSMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Control loop poll period. Must stay well below [`DEBOUNCE_INTERVAL`] so
/// that edges are observed individually.
pub const POLL_PERIOD: Duration = Duration::from_millis(2);

/// Baud rate shared by the tide, wind-direction and LoRa UARTs
pub const SERIAL_BAUD: u32 = 9600;

/// Runtime view of the station configuration
#[derive(Debug, Clone, Copy)]
pub struct StationConfig<'a> {
    pub station_id: &'a str,
    pub transmit_interval: Duration,
    pub anemometer: AnemometerSettings,
    pub tide: TideConfig,
    pub feasibility: FeasibilityThresholds,
}

/// Tide sensor tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TideConfig {
    pub threshold_mm: u16,
    pub stale_after: Duration,
}

impl Default for TideConfig {
    fn default() -> Self {
        Self {
            threshold_mm: TIDE_THRESHOLD_MM,
            stale_after: TIDE_STALE_AFTER,
        }
    }
}

impl Default for StationConfig<'_> {
    fn default() -> Self {
        Self {
            station_id: DEFAULT_STATION_ID,
            transmit_interval: TRANSMIT_INTERVAL,
            anemometer: AnemometerSettings::default(),
            tide: TideConfig::default(),
            feasibility: FeasibilityThresholds::default(),
        }
    }
}

impl<'a> StationConfig<'a> {
    /// Default configuration with a different station identifier
    pub fn with_station_id(station_id: &'a str) -> Self {
        Self {
            station_id,
            ..Self::default()
        }
    }
}

impl Default for AnemometerSettings {
    fn default() -> Self {
        Self {
            debounce: DEBOUNCE_INTERVAL,
            window: ANEMOMETER_WINDOW,
            calibration: Calibration::DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let config = StationConfig::default();
        assert_eq!(config.station_id, "Jawa");
        assert_eq!(config.transmit_interval, Duration::from_secs(1));
        assert_eq!(config.anemometer.debounce, Duration::from_millis(5));
        assert_eq!(config.anemometer.window, Duration::from_secs(10));
        assert_eq!(config.tide.threshold_mm, 500);
        assert_eq!(config.feasibility.max_wind_speed, 10.0);
    }

    #[test]
    fn test_poll_period_below_debounce() {
        assert!(POLL_PERIOD < DEBOUNCE_INTERVAL);
    }

    #[test]
    fn test_with_station_id_keeps_defaults() {
        let config = StationConfig::with_station_id("Bali");
        assert_eq!(config.station_id, "Bali");
        assert_eq!(config.tide, TideConfig::default());
    }
}
