//! Uplink line encoding and dual-channel transmission
//!
//! One ASCII line per broadcast:
//!
//! ```text
//! <stationId>,<PASANG|SURUT|NA>,<temp>,<pressure>,<humidity>,<speed>,<direction>;
//! ```
//!
//! Floats are written with two decimals. The line is sent, newline
//! terminated, on the LoRa radio UART and mirrored on the diagnostic port.
//! Channels are never flushed: the control loop must not wait for the
//! radio to drain or for a host to read the diagnostic port.

use core::fmt::Write as _;

use embedded_io::Write;
use log::error;
use thiserror_no_std::Error;

use super::TelemetryRecord;

/// Capacity of one encoded uplink line (without the trailing newline)
pub const MAX_LINE_LEN: usize = 128;

pub type UplinkLine = heapless::String<MAX_LINE_LEN>;

pub const FIELD_SEPARATOR: char = ',';
pub const RECORD_TERMINATOR: char = ';';

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkError {
    #[error("encoded line exceeds {MAX_LINE_LEN} bytes")]
    LineTooLong,
    #[error("station id is empty, too long or contains a separator")]
    InvalidStationId,
    #[error("radio write failed ({0:?})")]
    Radio(embedded_io::ErrorKind),
    #[error("diagnostic write failed ({0:?})")]
    Diagnostic(embedded_io::ErrorKind),
}

/// Encode `record` as a single uplink line.
pub fn encode(record: &TelemetryRecord, station_id: &str) -> Result<UplinkLine, UplinkError> {
    let mut line = UplinkLine::new();
    write!(
        line,
        "{id},{tide},{temp:.2},{pressure:.2},{humidity:.2},{speed:.2},{direction};",
        id = station_id,
        tide = record.tide_state.label(),
        temp = record.temperature,
        pressure = record.pressure,
        humidity = record.humidity,
        speed = record.wind_speed_mps,
        direction = record.wind_direction.label(),
    )
    .map_err(|_| UplinkError::LineTooLong)?;
    Ok(line)
}

/// Writes every line to the radio and the diagnostic channel.
pub struct DualUplink<R, D> {
    radio: R,
    diagnostic: D,
}

impl<R: Write, D: Write> DualUplink<R, D> {
    pub fn new(radio: R, diagnostic: D) -> Self {
        Self { radio, diagnostic }
    }

    /// Send `line` followed by a newline on both channels.
    ///
    /// The diagnostic channel is written even when the radio fails. The
    /// first failure is returned.
    pub fn transmit(&mut self, line: &str) -> Result<(), UplinkError> {
        let radio = send_line(&mut self.radio, line).map_err(|kind| {
            error!("Uplink: radio write failed: {:?}", kind);
            UplinkError::Radio(kind)
        });
        let diagnostic = send_line(&mut self.diagnostic, line).map_err(|kind| {
            error!("Uplink: diagnostic write failed: {:?}", kind);
            UplinkError::Diagnostic(kind)
        });

        radio.and(diagnostic)
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn diagnostic(&self) -> &D {
        &self.diagnostic
    }
}

fn send_line<W: Write>(channel: &mut W, line: &str) -> Result<(), embedded_io::ErrorKind> {
    use embedded_io::Error as _;

    channel
        .write_all(line.as_bytes())
        .and_then(|_| channel.write_all(b"\n"))
        .map_err(|e| e.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSerial;
    use crate::sensors::tide::TideState;
    use crate::sensors::wind_direction::CompassDirection;

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord {
            temperature: 28.456,
            humidity: 81.0,
            pressure: 100_812.5,
            wind_speed_mps: 6.1,
            wave_count: 0,
            wind_direction: CompassDirection::SouthWest,
            tide_state: TideState::Falling,
        }
    }

    #[test]
    fn test_encode_layout() {
        let line = encode(&sample_record(), "Jawa").unwrap();
        assert_eq!(
            line.as_str(),
            "Jawa,SURUT,28.46,100812.50,81.00,6.10,barat daya;"
        );
    }

    #[test]
    fn test_encode_fields_split_back_in_order() {
        let record = sample_record();
        let line = encode(&record, "Jawa").unwrap();

        let body = line.strip_suffix(RECORD_TERMINATOR).unwrap();
        let fields: heapless::Vec<&str, 8> = body.split(FIELD_SEPARATOR).collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0], "Jawa");
        assert_eq!(fields[1], record.tide_state.label());
        assert_eq!(fields[2].parse::<f32>().unwrap(), 28.46);
        assert_eq!(fields[3].parse::<f32>().unwrap(), 100_812.5);
        assert_eq!(fields[4].parse::<f32>().unwrap(), 81.0);
        assert_eq!(fields[5].parse::<f32>().unwrap(), 6.1);
        assert_eq!(fields[6], record.wind_direction.label());
    }

    #[test]
    fn test_encode_unknown_fields() {
        let line = encode(&TelemetryRecord::default(), "Jawa").unwrap();
        assert_eq!(line.as_str(), "Jawa,NA,0.00,0.00,0.00,0.00,NA;");
    }

    #[test]
    fn test_encode_overflow_is_an_error() {
        let record = TelemetryRecord {
            temperature: f32::MAX,
            pressure: f32::MAX,
            humidity: f32::MAX,
            wind_speed_mps: f32::MAX,
            ..TelemetryRecord::default()
        };
        assert_eq!(encode(&record, "Jawa"), Err(UplinkError::LineTooLong));
    }

    #[test]
    fn test_transmit_writes_both_channels() {
        let radio = MockSerial::new();
        let diagnostic = MockSerial::new();
        let mut uplink = DualUplink::new(radio.clone(), diagnostic.clone());

        uplink.transmit("Jawa,SURUT,1.00,2.00,3.00,0.00,utara;").unwrap();

        let expected = b"Jawa,SURUT,1.00,2.00,3.00,0.00,utara;\n";
        assert_eq!(radio.tx(), expected);
        assert_eq!(diagnostic.tx(), expected);
    }

    #[test]
    fn test_transmit_does_not_wait_for_channels_to_drain() {
        let radio = MockSerial::new();
        let diagnostic = MockSerial::new();
        let mut uplink = DualUplink::new(radio.clone(), diagnostic.clone());

        for _ in 0..3 {
            uplink.transmit("Jawa,NA,0.00,0.00,0.00,0.00,NA;").unwrap();
        }

        assert_eq!(radio.flushes(), 0);
        assert_eq!(diagnostic.flushes(), 0);
        assert_eq!(radio.tx().len(), 3 * 32);
    }

    #[test]
    fn test_transmit_mirrors_even_when_radio_fails() {
        let mut radio = MockSerial::new();
        let diagnostic = MockSerial::new();
        radio.set_fail_writes(true);
        let mut uplink = DualUplink::new(radio.clone(), diagnostic.clone());

        let result = uplink.transmit("Jawa,NA,0.00,0.00,0.00,0.00,NA;");

        assert_eq!(
            result,
            Err(UplinkError::Radio(embedded_io::ErrorKind::BrokenPipe))
        );
        assert!(radio.tx().is_empty());
        assert_eq!(diagnostic.tx(), b"Jawa,NA,0.00,0.00,0.00,0.00,NA;\n");
    }
}
