//! Sailing feasibility assessment
//!
//! Maps the aggregated telemetry record to a safety verdict for small boats
//! leaving the harbour. The rules form a decision list evaluated top to
//! bottom; the first matching rule decides.

use crate::config::MAX_WIND_SPEED;
use crate::sensors::tide::TideState;
use crate::sensors::wind_direction::CompassDirection;
use crate::telemetry::TelemetryRecord;

/// Onshore directions that make departure unsafe
pub const UNSAFE_DIRECTIONS: &[CompassDirection] =
    &[CompassDirection::South, CompassDirection::SouthWest];

/// Thresholds used by [`Verdict::assess`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeasibilityThresholds {
    /// Wind speed above which sailing is unsafe [m/s]
    pub max_wind_speed: f32,
    pub unsafe_directions: &'static [CompassDirection],
}

impl Default for FeasibilityThresholds {
    fn default() -> Self {
        Self {
            max_wind_speed: MAX_WIND_SPEED,
            unsafe_directions: UNSAFE_DIRECTIONS,
        }
    }
}

/// Sailing safety verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Tide is rising
    UnsafeTide,
    /// Wind is above the speed limit
    UnsafeWindSpeed,
    /// Wind blows from an unsafe direction
    UnsafeWindDirection,
    Safe,
}

impl Verdict {
    /// Assess a telemetry record against `thresholds`
    ///
    /// Tide is checked first, then wind speed, then wind direction. Unknown
    /// tide and unknown direction never make a record unsafe on their own.
    pub fn assess(record: &TelemetryRecord, thresholds: &FeasibilityThresholds) -> Self {
        if record.tide_state == TideState::Rising {
            Self::UnsafeTide
        } else if record.wind_speed_mps > thresholds.max_wind_speed {
            Self::UnsafeWindSpeed
        } else if thresholds
            .unsafe_directions
            .contains(&record.wind_direction)
        {
            Self::UnsafeWindDirection
        } else {
            Self::Safe
        }
    }

    /// Machine-readable label
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnsafeTide => "UNSAFE_TIDE",
            Self::UnsafeWindSpeed => "UNSAFE_WIND_SPEED",
            Self::UnsafeWindDirection => "UNSAFE_WIND_DIRECTION",
            Self::Safe => "SAFE",
        }
    }

    /// Advisory text shown to fishermen at the harbour
    pub const fn advisory(self) -> &'static str {
        match self {
            Self::UnsafeTide => "Tidak aman berlayar: Air sedang pasang.",
            Self::UnsafeWindSpeed => "Tidak aman berlayar: Kecepatan angin terlalu tinggi.",
            Self::UnsafeWindDirection => "Tidak aman berlayar: Arah angin tidak mendukung.",
            Self::Safe => "Aman untuk berlayar.",
        }
    }

    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Safe)
    }
}

/// Assess `record` with the default thresholds
pub fn evaluate(record: &TelemetryRecord) -> Verdict {
    Verdict::assess(record, &FeasibilityThresholds::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tide: TideState, speed: f32, direction: CompassDirection) -> TelemetryRecord {
        TelemetryRecord {
            tide_state: tide,
            wind_speed_mps: speed,
            wind_direction: direction,
            ..TelemetryRecord::default()
        }
    }

    #[test]
    fn test_rising_tide_wins_over_everything() {
        let r = record(TideState::Rising, 15.0, CompassDirection::South);
        assert_eq!(evaluate(&r), Verdict::UnsafeTide);
    }

    #[test]
    fn test_wind_speed_checked_before_direction() {
        let r = record(TideState::Falling, 12.0, CompassDirection::SouthWest);
        assert_eq!(evaluate(&r), Verdict::UnsafeWindSpeed);
    }

    #[test]
    fn test_speed_limit_is_exclusive() {
        let r = record(TideState::Falling, 10.0, CompassDirection::North);
        assert_eq!(evaluate(&r), Verdict::Safe);
    }

    #[test]
    fn test_unsafe_directions() {
        for direction in [CompassDirection::South, CompassDirection::SouthWest] {
            let r = record(TideState::Falling, 3.0, direction);
            assert_eq!(evaluate(&r), Verdict::UnsafeWindDirection);
        }
        let r = record(TideState::Falling, 3.0, CompassDirection::SouthEast);
        assert_eq!(evaluate(&r), Verdict::Safe);
    }

    #[test]
    fn test_unknown_fields_are_not_unsafe() {
        assert_eq!(evaluate(&TelemetryRecord::default()), Verdict::Safe);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = FeasibilityThresholds {
            max_wind_speed: 5.0,
            unsafe_directions: &[CompassDirection::East],
        };
        let r = record(TideState::Falling, 6.0, CompassDirection::North);
        assert_eq!(Verdict::assess(&r, &thresholds), Verdict::UnsafeWindSpeed);

        let r = record(TideState::Falling, 2.0, CompassDirection::East);
        assert_eq!(Verdict::assess(&r, &thresholds), Verdict::UnsafeWindDirection);
    }

    #[test]
    fn test_labels_and_advisories() {
        assert_eq!(Verdict::UnsafeTide.label(), "UNSAFE_TIDE");
        assert_eq!(Verdict::Safe.advisory(), "Aman untuk berlayar.");
        assert!(Verdict::Safe.is_safe());
        assert!(!Verdict::UnsafeWindDirection.is_safe());
    }
}
