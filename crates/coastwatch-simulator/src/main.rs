//! Desktop simulator for the coastwatch station.
//!
//! Drives the core `Station` on a simulated clock with synthetic sensors:
//! anemometer pulses are latched as if the GPIO interrupt fired, tide frames
//! and wind vane lines are fed through in-memory serial ports, and the
//! environmental sensor returns slowly varying readings. A few corrupted
//! tide frames and unmapped vane codes are mixed in.
//!
//! Uplink lines are written to stdout; the diagnostic mirror and the logs
//! (`RUST_LOG=info`) go to stderr.
//!
//! # Usage
//!
//! ```text
//! coastwatch-simulator [SECONDS]
//! ```
//!
//! Runs for `SECONDS` of station time, or until interrupted when omitted.
//! `STATION_ID` overrides the default station identifier.

use std::f64::consts::TAU;
use std::io;
use std::process::ExitCode;
use std::time::Duration as StdDuration;

use coastwatch_core::config::{POLL_PERIOD, StationConfig};
use coastwatch_core::mock::{MockEdgeInterrupt, MockSerial};
use coastwatch_core::sensors::tide::SYNC_BYTE;
use coastwatch_core::sensors::{EdgeLatch, EnvironmentReadings, Sensor, SensorError};
use coastwatch_core::{Station, StationParts};
use embassy_futures::block_on;
use embassy_time::Instant;
use embedded_io::{ErrorKind, ErrorType, Write};
use log::{error, info, warn};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Station time runs this many times faster than wall-clock time.
const TIME_SCALE: u64 = 20;

/// Station time between two pacing sleeps, in milliseconds.
const PACING_STEP_MS: u64 = 50;

/// The tide gauge emits one frame every 500 ms.
const TIDE_FRAME_INTERVAL_MS: u64 = 500;

/// The wind vane emits one line per second.
const DIRECTION_INTERVAL_MS: u64 = 1_000;

/// Every n-th tide frame carries a bad checksum.
const CORRUPT_TIDE_EVERY: u64 = 23;

/// Every n-th vane line carries an unmapped code.
const BAD_VANE_LINE_EVERY: u64 = 17;

// ---------------------------------------------------------------------------
// Synthetic sensors
// ---------------------------------------------------------------------------

/// Generates anemometer pulses and the tide and vane byte streams.
struct SyntheticWeather {
    next_pulse_ms: Option<u64>,
    tide_frames: u64,
    vane_lines: u64,
}

impl SyntheticWeather {
    fn new() -> Self {
        Self {
            next_pulse_ms: None,
            tide_frames: 0,
            vane_lines: 0,
        }
    }

    /// Cup rotations per second: a gusty breeze around 2.5 rps.
    fn rotations_per_second(t: f64) -> f64 {
        (2.5 + 1.8 * (t / 90.0).sin() + 0.6 * (t / 13.0).sin()).max(0.0)
    }

    /// Sensor-to-water distance over a compressed three-minute tide cycle.
    fn water_distance_mm(t: f64) -> u16 {
        (520.0 + 260.0 * (t * TAU / 180.0).sin()) as u16
    }

    /// Vane code `1..=8`, veering every 45 seconds.
    fn vane_code(t: f64) -> u64 {
        (t / 45.0) as u64 % 8 + 1
    }

    /// Whether the reed switch closes at `ms`.
    fn pulse_due(&mut self, ms: u64) -> bool {
        let rps = Self::rotations_per_second(ms as f64 / 1000.0);
        if rps < 0.05 {
            self.next_pulse_ms = None;
            return false;
        }

        let period_ms = (1000.0 / rps) as u64;
        match self.next_pulse_ms {
            None => {
                self.next_pulse_ms = Some(ms + period_ms);
                false
            }
            Some(due) if ms >= due => {
                self.next_pulse_ms = Some(due + period_ms);
                true
            }
            Some(_) => false,
        }
    }

    /// Next tide frame, preceded by a few idle `0xFF` markers.
    fn tide_bytes(&mut self, ms: u64) -> Vec<u8> {
        self.tide_frames += 1;

        let [hi, lo] = Self::water_distance_mm(ms as f64 / 1000.0).to_be_bytes();
        let checksum = SYNC_BYTE.wrapping_add(hi).wrapping_add(lo);

        let idle = (self.tide_frames % 3) as usize;
        let mut bytes = vec![SYNC_BYTE; 1 + idle];
        bytes.extend([hi, lo, checksum]);

        if self.tide_frames % CORRUPT_TIDE_EVERY == 0 {
            if let Some(sum) = bytes.last_mut() {
                *sum = sum.wrapping_add(1);
            }
        }
        bytes
    }

    /// Next wind vane line.
    fn vane_line(&mut self, ms: u64) -> String {
        self.vane_lines += 1;
        if self.vane_lines % BAD_VANE_LINE_EVERY == 0 {
            return "*9#\r\n".to_string();
        }
        format!("*{}#\r\n", Self::vane_code(ms as f64 / 1000.0))
    }
}

/// Temperature, pressure and humidity with slow sinusoidal drift.
struct SyntheticEnvironment {
    /// One read per transmit interval, used as the time axis in seconds.
    reads: u32,
}

impl SyntheticEnvironment {
    fn new() -> Self {
        Self { reads: 0 }
    }
}

impl Sensor for SyntheticEnvironment {
    type Readings = EnvironmentReadings;

    async fn read(&mut self) -> Result<EnvironmentReadings, SensorError> {
        self.reads += 1;
        let t = f64::from(self.reads);

        // Temperature: 27–31 °C
        let temperature = 29.0 + 1.5 * (t / 600.0).sin() + 0.3 * (t / 47.0).cos();

        // Pressure: around 1009 hPa
        let pressure = 100_900.0 + 120.0 * (t / 900.0).sin();

        // Humidity: 70–86 %
        let humidity = 78.0 + 6.0 * (t / 420.0).cos() + 1.5 * (t / 31.0).sin();

        Ok(EnvironmentReadings {
            temperature_celsius: temperature as f32,
            pressure_pascal: pressure as f32,
            humidity_percent: humidity as f32,
        })
    }
}

// ---------------------------------------------------------------------------
// Output channels
// ---------------------------------------------------------------------------

/// `embedded-io` sink over a standard output stream.
struct StdSink<W> {
    inner: W,
}

impl<W: io::Write> StdSink<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: io::Write> ErrorType for StdSink<W> {
    type Error = ErrorKind;
}

impl<W: io::Write> Write for StdSink<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.inner.write(buf).map_err(to_error_kind)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush().map_err(to_error_kind)
    }
}

fn to_error_kind(e: io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
        io::ErrorKind::Interrupted => ErrorKind::Interrupted,
        io::ErrorKind::WriteZero => ErrorKind::WriteZero,
        _ => ErrorKind::Other,
    }
}

/// Parse the SECONDS argument into milliseconds of station time.
fn parse_run_time(arg: &str) -> Result<u64, String> {
    let secs = arg.parse::<u64>().map_err(|e| e.to_string())?;
    secs.checked_mul(1000)
        .ok_or_else(|| format!("{} s is too long to simulate", secs))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();

    let run_for_ms = match std::env::args().nth(1).map(|arg| parse_run_time(&arg)) {
        None => None,
        Some(Ok(ms)) => Some(ms),
        Some(Err(e)) => {
            error!("Invalid duration: {}", e);
            eprintln!("usage: coastwatch-simulator [SECONDS]");
            return ExitCode::from(2);
        }
    };

    let station_id = std::env::var("STATION_ID").ok();
    let config = match &station_id {
        Some(id) => StationConfig::with_station_id(id),
        None => StationConfig::default(),
    };

    info!("Starting coastwatch simulator");
    info!(
        "Station '{}', {}x real time, poll period {} ms",
        config.station_id,
        TIME_SCALE,
        POLL_PERIOD.as_millis()
    );

    // Edge latch and serial ports shared with the station
    let latch = EdgeLatch::new();
    let mut tide_port = MockSerial::new();
    let mut vane_port = MockSerial::new();

    let parts = StationParts {
        edge_latch: &latch,
        edge_interrupt: MockEdgeInterrupt::new(),
        tide_stream: Some(tide_port.clone()),
        direction_stream: Some(vane_port.clone()),
        environment: Some(SyntheticEnvironment::new()),
        radio: StdSink::new(io::stdout()),
        diagnostic: StdSink::new(io::stderr()),
    };
    let mut station = match Station::new(parts, &config, Instant::from_millis(0)) {
        Ok(station) => station,
        Err(e) => {
            error!("Cannot start station: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut weather = SyntheticWeather::new();
    let step_ms = POLL_PERIOD.as_millis();
    let mut ms: u64 = 0;

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    while run_for_ms.is_none_or(|end| ms <= end) {
        // --- Sensor traffic -----------------------------------------------
        if weather.pulse_due(ms) {
            latch.on_edge(Instant::from_millis(ms));
        }
        if ms % TIDE_FRAME_INTERVAL_MS == 0 {
            tide_port.inject_rx(&weather.tide_bytes(ms));
        }
        if ms % DIRECTION_INTERVAL_MS == 0 {
            vane_port.inject_rx(weather.vane_line(ms).as_bytes());
        }

        // --- Station tick -------------------------------------------------
        match block_on(station.tick(Instant::from_millis(ms))) {
            Ok(Some(transmission)) if !transmission.verdict.is_safe() => {
                warn!("{}", transmission.verdict.advisory());
            }
            Ok(_) => {}
            Err(e) => error!("Station: {}", e),
        }

        // --- Pacing -------------------------------------------------------
        if ms % PACING_STEP_MS == 0 {
            std::thread::sleep(StdDuration::from_millis(PACING_STEP_MS / TIME_SCALE));
        }
        ms += step_ms;
    }

    info!("Simulator exiting after {} s of station time", ms / 1000);
    ExitCode::SUCCESS
}
