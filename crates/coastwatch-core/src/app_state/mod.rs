//! Station state and the per-tick control loop

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::config::StationConfig;
use crate::feasibility::{FeasibilityThresholds, Verdict};
use crate::sensors::anemometer::{Anemometer, EdgeInterrupt, EdgeLatch};
use crate::sensors::environment::{EnvironmentReadings, EnvironmentSensor};
use crate::sensors::tide::TideSensor;
use crate::sensors::wind_direction::WindDirectionSensor;
use crate::sensors::SensorError;
use crate::telemetry::{
    DualUplink, TelemetryAggregator, TelemetryRecord, TelemetryUpdate, UplinkError, UplinkLine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationRunState {
    /// Nothing transmitted yet
    Starting,
    /// Last transmission reached both channels
    Running,
    /// Last transmission failed on at least one channel
    Degraded,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    #[error("Uplink error: {0}")]
    Uplink(UplinkError),
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
}

impl From<UplinkError> for AppError {
    fn from(error: UplinkError) -> Self {
        Self::Uplink(error)
    }
}

impl From<SensorError> for AppError {
    fn from(error: SensorError) -> Self {
        Self::Sensor(error)
    }
}

/// Hardware handed to [`Station::new`]
///
/// Streams left as `None` are not polled and their record fields stay at
/// their initial values.
pub struct StationParts<'a, I, T, W, E, R, D> {
    pub edge_latch: &'a EdgeLatch,
    pub edge_interrupt: I,
    pub tide_stream: Option<T>,
    pub direction_stream: Option<W>,
    pub environment: Option<E>,
    pub radio: R,
    pub diagnostic: D,
}

/// One broadcast performed by [`Station::tick`]
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub line: UplinkLine,
    pub verdict: Verdict,
}

/// The coastal station: every acquisition component, the aggregator and the
/// uplink, driven by [`Station::tick`].
///
/// `tick` must be called more often than the anemometer debounce interval,
/// since each call takes at most one latched edge.
pub struct Station<'a, I, T, W, E, R, D> {
    anemometer: Anemometer<'a, I>,
    tide: Option<TideSensor<T>>,
    direction: Option<WindDirectionSensor<W>>,
    environment: Option<E>,
    aggregator: TelemetryAggregator,
    uplink: DualUplink<R, D>,
    thresholds: FeasibilityThresholds,
    transmit_interval: Duration,
    next_transmit: Instant,
    run_state: StationRunState,
}

impl<'a, I, T, W, E, R, D> Station<'a, I, T, W, E, R, D>
where
    I: EdgeInterrupt,
    T: Read + ReadReady,
    W: Read + ReadReady,
    E: EnvironmentSensor,
    R: Write,
    D: Write,
{
    /// Build the station. The first broadcast is due one transmit interval
    /// after `now`.
    pub fn new(
        parts: StationParts<'a, I, T, W, E, R, D>,
        config: &StationConfig<'_>,
        now: Instant,
    ) -> Result<Self, AppError> {
        let aggregator = TelemetryAggregator::new(config.station_id)?;

        info!(
            "Station '{}': tide {}, wind direction {}, environment {}",
            config.station_id,
            fitted(parts.tide_stream.is_some()),
            fitted(parts.direction_stream.is_some()),
            fitted(parts.environment.is_some()),
        );

        Ok(Self {
            anemometer: Anemometer::new(
                parts.edge_latch,
                parts.edge_interrupt,
                config.anemometer,
                now,
            ),
            tide: parts
                .tide_stream
                .map(|stream| TideSensor::new(stream, config.tide, now)),
            direction: parts.direction_stream.map(WindDirectionSensor::new),
            environment: parts.environment,
            aggregator,
            uplink: DualUplink::new(parts.radio, parts.diagnostic),
            thresholds: config.feasibility,
            transmit_interval: config.transmit_interval,
            next_transmit: now + config.transmit_interval,
            run_state: StationRunState::Starting,
        })
    }

    /// Run one control loop iteration.
    ///
    /// Polls the anemometer and the serial sensors, applies their updates,
    /// and when the transmit interval has elapsed reads the environmental
    /// sensor, broadcasts the record and assesses it. Sensor errors are
    /// logged and tolerated; uplink errors are returned after both channels
    /// were tried.
    pub async fn tick(&mut self, now: Instant) -> Result<Option<Transmission>, AppError> {
        if let Some(speed) = self.anemometer.poll(now) {
            self.aggregator.apply(TelemetryUpdate::WindSpeed(speed));
        }

        if let Some(tide) = &mut self.tide {
            match tide.poll(now) {
                Ok(Some(state)) => self.aggregator.apply(TelemetryUpdate::Tide(state)),
                Ok(None) => {}
                Err(e) => warn!("Station: {}", e),
            }
        }

        if let Some(direction) = &mut self.direction {
            match direction.poll() {
                Ok(Some(direction)) => self
                    .aggregator
                    .apply(TelemetryUpdate::WindDirection(direction)),
                Ok(None) => {}
                Err(e) => warn!("Station: {}", e),
            }
        }

        if now < self.next_transmit {
            return Ok(None);
        }
        self.schedule_next_transmit(now);

        if let Err(e) = self.sample_environment().await {
            warn!("Station: keeping previous environment readings: {}", e);
        }

        self.broadcast().map(Some)
    }

    /// Read the environmental sensor, if fitted, and apply the readings
    pub async fn sample_environment(&mut self) -> Result<Option<EnvironmentReadings>, AppError> {
        let Some(sensor) = &mut self.environment else {
            return Ok(None);
        };

        let readings = sensor.read().await?;
        self.aggregator.apply(readings.into());
        Ok(Some(readings))
    }

    fn broadcast(&mut self) -> Result<Transmission, AppError> {
        let line = self.aggregator.encode()?;
        let verdict = Verdict::assess(self.aggregator.record(), &self.thresholds);
        info!("{}", line);
        info!("Feasibility: {} ({})", verdict.label(), verdict.advisory());

        let sent = self.uplink.transmit(&line);
        self.set_run_state(if sent.is_ok() {
            StationRunState::Running
        } else {
            StationRunState::Degraded
        });
        sent?;

        Ok(Transmission { line, verdict })
    }

    fn schedule_next_transmit(&mut self, now: Instant) {
        self.next_transmit += self.transmit_interval;
        if self.next_transmit <= now {
            debug!(
                "Station: {} ms behind schedule, rescheduling from now",
                now.saturating_duration_since(self.next_transmit).as_millis()
            );
            self.next_transmit = now + self.transmit_interval;
        }
    }

    fn set_run_state(&mut self, state: StationRunState) {
        if state != self.run_state {
            info!("Station: {:?} -> {:?}", self.run_state, state);
            self.run_state = state;
        }
    }

    pub fn run_state(&self) -> StationRunState {
        self.run_state
    }

    pub fn record(&self) -> &TelemetryRecord {
        self.aggregator.record()
    }

    pub fn next_transmit(&self) -> Instant {
        self.next_transmit
    }

    pub fn anemometer(&self) -> &Anemometer<'a, I> {
        &self.anemometer
    }

    pub fn uplink(&self) -> &DualUplink<R, D> {
        &self.uplink
    }
}

fn fitted(present: bool) -> &'static str {
    if present { "fitted" } else { "absent" }
}
