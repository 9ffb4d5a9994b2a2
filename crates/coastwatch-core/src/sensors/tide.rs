//! Ultrasonic distance sensor used as a tide gauge
//!
//! The sensor streams 4-byte frames over UART:
//!
//! | Byte | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | `0xFF` sync                               |
//! | 1    | distance high byte (mm)                   |
//! | 2    | distance low byte (mm)                    |
//! | 3    | low byte of `byte0 + byte1 + byte2`       |
//!
//! Extra `0xFF` bytes may appear between frames as idle markers. A distance
//! below the configured threshold means the water is close to the sensor, so
//! the tide is rising (*pasang*); otherwise it is falling (*surut*).

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::config::TideConfig;
use crate::sensors::SensorError;

pub const FRAME_LEN: usize = 4;
pub const SYNC_BYTE: u8 = 0xFF;

const SENSOR_NAME: &str = "tide";

/// Tide state as reported on the uplink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TideState {
    /// Water closer than the threshold (*pasang*)
    Rising,
    /// Water further than the threshold (*surut*)
    Falling,
    /// No valid frame yet, or the sensor went silent
    #[default]
    Unknown,
}

impl TideState {
    /// Uplink label
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rising => "PASANG",
            Self::Falling => "SURUT",
            Self::Unknown => "NA",
        }
    }
}

/// A raw 4-byte frame as read from the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TideFrame {
    pub bytes: [u8; FRAME_LEN],
}

impl TideFrame {
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    pub const fn sync_byte(&self) -> u8 {
        self.bytes[0]
    }

    pub const fn checksum_byte(&self) -> u8 {
        self.bytes[3]
    }

    /// Low byte of the sum of the first three bytes
    pub fn computed_checksum(&self) -> u8 {
        self.bytes[..3]
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TideError {
    #[error("bad sync byte {0:#04x}")]
    SyncByte(u8),
    #[error("checksum mismatch: computed {computed:#04x}, frame says {received:#04x}")]
    Checksum { computed: u8, received: u8 },
}

/// Check a frame and return the measured distance in millimetres.
pub fn validate(frame: &TideFrame) -> Result<u16, TideError> {
    if frame.sync_byte() != SYNC_BYTE {
        return Err(TideError::SyncByte(frame.sync_byte()));
    }

    let computed = frame.computed_checksum();
    if computed != frame.checksum_byte() {
        return Err(TideError::Checksum {
            computed,
            received: frame.checksum_byte(),
        });
    }

    Ok(u16::from_be_bytes([frame.bytes[1], frame.bytes[2]]))
}

/// Map a distance to a tide state.
pub const fn classify(distance_mm: u16, threshold_mm: u16) -> TideState {
    if distance_mm < threshold_mm {
        TideState::Rising
    } else {
        TideState::Falling
    }
}

/// Byte-level framing state machine.
///
/// Bytes before a sync byte are discarded. While only the sync byte is
/// buffered, further `0xFF` bytes are idle markers and realign the frame
/// start instead of becoming distance bytes.
#[derive(Debug, Default)]
pub struct TideFrameDecoder {
    buf: heapless::Vec<u8, FRAME_LEN>,
}

impl TideFrameDecoder {
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Feed one byte, returning a frame once four aligned bytes are collected.
    pub fn push(&mut self, byte: u8) -> Option<TideFrame> {
        match self.buf.len() {
            0 if byte != SYNC_BYTE => return None,
            1 if byte == SYNC_BYTE => return None,
            _ => {}
        }

        // Length is below FRAME_LEN here, the push cannot overflow
        let _ = self.buf.push(byte);

        if self.buf.len() == FRAME_LEN {
            let mut bytes = [0u8; FRAME_LEN];
            bytes.copy_from_slice(&self.buf);
            self.buf.clear();
            Some(TideFrame::new(bytes))
        } else {
            None
        }
    }

    /// Drop any partially collected frame
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes of the frame in progress
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Read whatever the stream has ready and return the first complete frame.
///
/// Never blocks: returns `Ok(None)` when no complete frame is available yet,
/// keeping partial progress in `decoder`. After a frame is found, all other
/// pending bytes are drained so the next call starts on a fresh frame.
pub fn read_frame<R>(
    stream: &mut R,
    decoder: &mut TideFrameDecoder,
) -> Result<Option<TideFrame>, R::Error>
where
    R: Read + ReadReady,
{
    let mut chunk = [0u8; 16];

    while stream.read_ready()? {
        let count = stream.read(&mut chunk)?;
        if count == 0 {
            break;
        }

        for &byte in &chunk[..count] {
            if let Some(frame) = decoder.push(byte) {
                decoder.reset();
                flush(stream)?;
                return Ok(Some(frame));
            }
        }
    }

    Ok(None)
}

/// Discard every byte currently pending on the stream
fn flush<R: Read + ReadReady>(stream: &mut R) -> Result<usize, R::Error> {
    let mut scratch = [0u8; 16];
    let mut discarded = 0;
    while stream.read_ready()? {
        let count = stream.read(&mut scratch)?;
        if count == 0 {
            break;
        }
        discarded += count;
    }
    if discarded > 0 {
        debug!("Tide: flushed {} trailing bytes", discarded);
    }
    Ok(discarded)
}

/// Tide gauge on a serial stream
pub struct TideSensor<R> {
    stream: R,
    decoder: TideFrameDecoder,
    config: TideConfig,
    state: TideState,
    last_distance_mm: Option<u16>,
    last_valid_at: Instant,
}

impl<R: Read + ReadReady> TideSensor<R> {
    pub fn new(stream: R, config: TideConfig, now: Instant) -> Self {
        Self {
            stream,
            decoder: TideFrameDecoder::new(),
            config,
            state: TideState::Unknown,
            last_distance_mm: None,
            last_valid_at: now,
        }
    }

    /// Read pending bytes and return the tide state when it should be
    /// published.
    ///
    /// A valid frame always publishes its classification. A rejected frame
    /// publishes nothing. When no valid frame arrived for
    /// [`TideConfig::stale_after`], [`TideState::Unknown`] is published once.
    pub fn poll(&mut self, now: Instant) -> Result<Option<TideState>, SensorError> {
        let frame = read_frame(&mut self.stream, &mut self.decoder)
            .map_err(|e| SensorError::stream(SENSOR_NAME, e))?;

        if let Some(frame) = frame {
            match validate(&frame) {
                Ok(distance_mm) => {
                    let state = classify(distance_mm, self.config.threshold_mm);
                    debug!("Tide: {} mm -> {}", distance_mm, state.label());
                    if state != self.state {
                        info!("Tide: state changed {:?} -> {:?}", self.state, state);
                    }
                    self.state = state;
                    self.last_distance_mm = Some(distance_mm);
                    self.last_valid_at = now;
                    return Ok(Some(state));
                }
                Err(e) => {
                    warn!("Tide: frame {:02x?} rejected: {}", frame.bytes, e);
                }
            }
        }

        if self.state != TideState::Unknown && self.silent_for(now) >= self.config.stale_after {
            warn!(
                "Tide: no valid frame for {} s, state unknown",
                self.silent_for(now).as_secs()
            );
            self.state = TideState::Unknown;
            return Ok(Some(TideState::Unknown));
        }

        Ok(None)
    }

    fn silent_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_valid_at)
    }

    pub fn state(&self) -> TideState {
        self.state
    }

    pub fn last_distance_mm(&self) -> Option<u16> {
        self.last_distance_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSerial;

    fn sensor(port: &MockSerial) -> TideSensor<MockSerial> {
        TideSensor::new(port.clone(), TideConfig::default(), Instant::from_millis(0))
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        // 0xFF + 0x01 + 0x2C = 0x12C, low byte 0x2C
        let frame = TideFrame::new([0xFF, 0x01, 0x2C, 0x2D]);
        assert_eq!(
            validate(&frame),
            Err(TideError::Checksum {
                computed: 0x2C,
                received: 0x2D
            })
        );
    }

    #[test]
    fn test_validate_accepts_good_frame() {
        let frame = TideFrame::new([0xFF, 0x01, 0x2C, 0x2C]);
        assert_eq!(validate(&frame), Ok(300));
        assert_eq!(classify(300, 500), TideState::Rising);
    }

    #[test]
    fn test_validate_rejects_bad_sync() {
        let frame = TideFrame::new([0xFE, 0x01, 0x2C, 0x2B]);
        assert_eq!(validate(&frame), Err(TideError::SyncByte(0xFE)));
    }

    #[test]
    fn test_classify_threshold_is_exclusive() {
        assert_eq!(classify(499, 500), TideState::Rising);
        assert_eq!(classify(500, 500), TideState::Falling);
        assert_eq!(classify(1200, 500), TideState::Falling);
        assert_eq!(classify(1200, 1500), TideState::Rising);
    }

    #[test]
    fn test_decoder_skips_noise_and_idle_markers() {
        let mut decoder = TideFrameDecoder::new();
        let mut frames = heapless::Vec::<TideFrame, 2>::new();
        for byte in [0x12, 0x34, 0xFF, 0xFF, 0xFF, 0x01, 0x2C, 0x2C] {
            if let Some(frame) = decoder.push(byte) {
                frames.push(frame).unwrap();
            }
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, [0xFF, 0x01, 0x2C, 0x2C]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_read_frame_returns_none_until_complete() {
        let mut port = MockSerial::new();
        let mut decoder = TideFrameDecoder::new();

        assert_eq!(read_frame(&mut port, &mut decoder), Ok(None));

        port.inject_rx(&[0xFF, 0x05]);
        assert_eq!(read_frame(&mut port, &mut decoder), Ok(None));
        assert_eq!(decoder.buffered(), 2);

        port.inject_rx(&[0xDC, 0xE0]);
        let frame = read_frame(&mut port, &mut decoder).unwrap().unwrap();
        assert_eq!(validate(&frame), Ok(0x05DC));
    }

    #[test]
    fn test_read_frame_flushes_trailing_bytes() {
        let mut port = MockSerial::new();
        let mut decoder = TideFrameDecoder::new();

        port.inject_rx(&[0xFF, 0x01, 0x2C, 0x2C, 0xFF, 0x07, 0xD0]);
        assert!(read_frame(&mut port, &mut decoder).unwrap().is_some());
        assert_eq!(port.rx_pending(), 0);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_sensor_publishes_rising_for_near_water() {
        let mut port = MockSerial::new();
        let mut tide = sensor(&port);

        port.inject_rx(&[0xFF, 0x01, 0x2C, 0x2C]);
        assert_eq!(tide.poll(Instant::from_millis(10)), Ok(Some(TideState::Rising)));
        assert_eq!(tide.last_distance_mm(), Some(300));
    }

    #[test]
    fn test_sensor_keeps_state_on_bad_checksum() {
        let mut port = MockSerial::new();
        let mut tide = sensor(&port);

        // 0x07D0 = 2000 mm, checksum (0xFF + 0x07 + 0xD0) & 0xFF = 0xD6
        port.inject_rx(&[0xFF, 0x07, 0xD0, 0xD6]);
        assert_eq!(tide.poll(Instant::from_millis(10)), Ok(Some(TideState::Falling)));

        port.inject_rx(&[0xFF, 0x01, 0x2C, 0x2D]);
        assert_eq!(tide.poll(Instant::from_millis(20)), Ok(None));
        assert_eq!(tide.state(), TideState::Falling);
    }

    #[test]
    fn test_sensor_goes_unknown_once_when_silent() {
        let mut port = MockSerial::new();
        let mut tide = sensor(&port);

        port.inject_rx(&[0xFF, 0x07, 0xD0, 0xD6]);
        assert_eq!(tide.poll(Instant::from_secs(1)), Ok(Some(TideState::Falling)));

        assert_eq!(tide.poll(Instant::from_secs(30)), Ok(None));
        assert_eq!(tide.poll(Instant::from_secs(31)), Ok(Some(TideState::Unknown)));
        assert_eq!(tide.poll(Instant::from_secs(60)), Ok(None));
        assert_eq!(tide.state(), TideState::Unknown);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(TideState::Rising.label(), "PASANG");
        assert_eq!(TideState::Falling.label(), "SURUT");
        assert_eq!(TideState::Unknown.label(), "NA");
    }
}
