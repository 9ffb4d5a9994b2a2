use log::debug;

use super::uplink::{UplinkError, UplinkLine, encode};
use super::{TelemetryRecord, TelemetryUpdate};

/// Longest station identifier accepted on the uplink
pub const MAX_STATION_ID_LEN: usize = 16;

/// Owner of the station's telemetry record
///
/// Producers hand their partial updates to [`TelemetryAggregator::apply`];
/// the record is never reset, so every broadcast carries the latest known
/// value of each field.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut aggregator = TelemetryAggregator::new("Jawa")?;
///
/// if let Some(speed) = anemometer.poll(now) {
///     aggregator.apply(TelemetryUpdate::WindSpeed(speed));
/// }
///
/// let line = aggregator.encode()?;
/// ```
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    record: TelemetryRecord,
    station_id: heapless::String<MAX_STATION_ID_LEN>,
}

impl TelemetryAggregator {
    /// Create an aggregator for `station_id`.
    ///
    /// The identifier must fit [`MAX_STATION_ID_LEN`] and must not contain the
    /// uplink field or record separators.
    pub fn new(station_id: &str) -> Result<Self, UplinkError> {
        if station_id.is_empty() || station_id.contains([',', ';', '\n']) {
            return Err(UplinkError::InvalidStationId);
        }

        let mut id = heapless::String::new();
        id.push_str(station_id)
            .map_err(|_| UplinkError::InvalidStationId)?;

        Ok(Self {
            record: TelemetryRecord::default(),
            station_id: id,
        })
    }

    /// Merge a partial update into the record
    pub fn apply(&mut self, update: TelemetryUpdate) {
        debug!("Telemetry: {:?}", update);
        self.record.apply(update);
    }

    /// Encode the current record as an uplink line
    pub fn encode(&self) -> Result<UplinkLine, UplinkError> {
        encode(&self.record, &self.station_id)
    }

    pub fn record(&self) -> &TelemetryRecord {
        &self.record
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }
}
