//! Wind vane with an ASCII serial output
//!
//! The vane sends lines of the form `*<code>#` where `<code>` is `1`..`8`.
//! Anything else on the line is noise. Malformed or unmapped frames are
//! dropped without logging; the next good frame supersedes them.

use embedded_io::{Read, ReadReady};
use log::debug;

use crate::sensors::SensorError;

const SENSOR_NAME: &str = "wind direction";

pub const START_DELIMITER: char = '*';
pub const END_DELIMITER: char = '#';

/// Longest line kept while waiting for a terminator
pub const MAX_LINE_LEN: usize = 64;

/// 8-point compass direction the wind blows from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompassDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    #[default]
    Unknown,
}

/// Sensor code to direction mapping as wired on the station's vane
const SENSOR_CODES: [(&str, CompassDirection); 8] = [
    ("1", CompassDirection::South),
    ("2", CompassDirection::SouthWest),
    ("3", CompassDirection::West),
    ("4", CompassDirection::NorthWest),
    ("5", CompassDirection::North),
    ("6", CompassDirection::NorthEast),
    ("7", CompassDirection::East),
    ("8", CompassDirection::SouthEast),
];

impl CompassDirection {
    /// Look up a sensor token. Only exact matches of `"1"`..`"8"` map.
    pub fn from_code(token: &str) -> Option<Self> {
        SENSOR_CODES
            .iter()
            .find(|(code, _)| *code == token)
            .map(|(_, direction)| *direction)
    }

    /// Uplink label (Indonesian compass names used by the ground station)
    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "utara",
            Self::NorthEast => "timur laut",
            Self::East => "timur",
            Self::SouthEast => "tenggara",
            Self::South => "selatan",
            Self::SouthWest => "barat daya",
            Self::West => "barat",
            Self::NorthWest => "barat laut",
            Self::Unknown => "NA",
        }
    }

    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
            Self::Unknown => "?",
        }
    }
}

/// Extract and map the token between the first `*` and the first `#`.
pub fn parse(line: &str) -> Option<CompassDirection> {
    let start = line.find(START_DELIMITER)?;
    let end = line.find(END_DELIMITER)?;
    if end < start {
        return None;
    }
    CompassDirection::from_code(&line[start + 1..end])
}

/// Non-blocking line assembler.
///
/// A line ends at `#` (kept in the line) or `\n`. Bytes following the
/// terminator stay buffered for the next line.
#[derive(Debug, Default)]
pub struct LineReader<const N: usize> {
    buf: heapless::Vec<u8, N>,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Pull ready bytes from `stream` and return the next complete line.
    ///
    /// Returns `Ok(None)` when no complete line is pending. Reads never go
    /// past the free space in the buffer, so only a full buffer without a
    /// terminator is discarded.
    pub fn read_line<R>(
        &mut self,
        stream: &mut R,
    ) -> Result<Option<heapless::String<N>>, R::Error>
    where
        R: Read + ReadReady,
    {
        let mut chunk = [0u8; 16];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.buf.is_full() {
                debug!("Wind direction: line overflow, {} bytes dropped", N);
                self.buf.clear();
            }
            if !stream.read_ready()? {
                return Ok(None);
            }

            let room = chunk.len().min(N - self.buf.len());
            let count = stream.read(&mut chunk[..room])?;
            if count == 0 {
                return Ok(None);
            }
            // Fits: `count <= room`
            let _ = self.buf.extend_from_slice(&chunk[..count]);
        }
    }

    /// Split off the first terminated line, if any
    fn take_line(&mut self) -> Option<heapless::String<N>> {
        loop {
            let end = self
                .buf
                .iter()
                .position(|&b| b == END_DELIMITER as u8 || b == b'\n')?;
            let keep = if self.buf[end] == b'\n' { end } else { end + 1 };

            let line = heapless::Vec::<u8, N>::from_slice(&self.buf[..keep]).ok();

            let consumed = end + 1;
            let remaining = self.buf.len() - consumed;
            self.buf.copy_within(consumed.., 0);
            self.buf.truncate(remaining);

            match line.map(heapless::String::from_utf8) {
                Some(Ok(line)) => return Some(line),
                // Not UTF-8: drop it and look for the next line
                _ => continue,
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Wind vane on a serial stream
pub struct WindDirectionSensor<R> {
    stream: R,
    reader: LineReader<MAX_LINE_LEN>,
    direction: CompassDirection,
}

impl<R: Read + ReadReady> WindDirectionSensor<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            reader: LineReader::new(),
            direction: CompassDirection::Unknown,
        }
    }

    /// Consume pending lines and return the newest direction parsed from them.
    pub fn poll(&mut self) -> Result<Option<CompassDirection>, SensorError> {
        let mut latest = None;

        while let Some(line) = self
            .reader
            .read_line(&mut self.stream)
            .map_err(|e| SensorError::stream(SENSOR_NAME, e))?
        {
            if let Some(direction) = parse(&line) {
                latest = Some(direction);
            }
        }

        if let Some(direction) = latest {
            self.direction = direction;
        }
        Ok(latest)
    }

    pub fn direction(&self) -> CompassDirection {
        self.direction
    }
}
