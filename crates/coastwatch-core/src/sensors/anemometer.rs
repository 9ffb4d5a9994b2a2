//! Pulse-rate cup anemometer
//!
//! The anemometer closes a reed contact once per rotation. Every rising edge
//! raises a GPIO interrupt whose handler only stamps an [`EdgeLatch`]. The
//! control loop then calls [`Anemometer::poll`] on each tick, which debounces
//! latched edges into a pulse count and, once per window, converts the count
//! into a calibrated wind speed.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use log::{debug, info};

use crate::config::{CALIBRATION_A, CALIBRATION_B, CALIBRATION_C, WIND_SPEED_NOISE_FLOOR};

/// Control over the hardware edge interrupt feeding an [`EdgeLatch`].
///
/// The window-close computation disables the source while it reads and
/// clears the pulse count.
pub trait EdgeInterrupt {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// Single-slot latch shared between the edge interrupt handler and the
/// control loop.
///
/// Meant to live in a `static`:
///
/// ```rust,ignore
/// static ANEMOMETER_EDGES: EdgeLatch = EdgeLatch::new();
///
/// #[handler]
/// fn on_gpio() {
///     ANEMOMETER_EDGES.on_edge(Instant::now());
/// }
/// ```
pub struct EdgeLatch {
    observed: AtomicBool,
    at: Mutex<CriticalSectionRawMutex, Cell<Instant>>,
}

impl EdgeLatch {
    pub const fn new() -> Self {
        Self {
            observed: AtomicBool::new(false),
            at: Mutex::new(Cell::new(Instant::MIN)),
        }
    }

    /// Record a rising edge. Safe to call from interrupt context.
    #[inline]
    pub fn on_edge(&self, at: Instant) {
        self.at.lock(|cell| cell.set(at));
        self.observed.store(true, Ordering::Release);
    }

    /// Clear the observed flag, returning the latest edge timestamp if one
    /// was latched since the previous call.
    pub fn take(&self) -> Option<Instant> {
        if self.observed.swap(false, Ordering::Acquire) {
            Some(self.at.lock(|cell| cell.get()))
        } else {
            None
        }
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Calibration polynomial mapping rotations per second to m/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    /// Speeds at or below this value are reported as 0
    pub noise_floor: f32,
}

impl Calibration {
    pub const DEFAULT: Self = Self {
        a: CALIBRATION_A,
        b: CALIBRATION_B,
        c: CALIBRATION_C,
        noise_floor: WIND_SPEED_NOISE_FLOOR,
    };

    /// Polynomial value without the noise-floor clamp
    pub fn raw_speed(&self, rotations_per_second: f32) -> f32 {
        let r = rotations_per_second;
        self.a * r * r + self.b * r + self.c
    }

    /// Calibrated wind speed in m/s, clamped to 0 at or below the noise floor
    pub fn speed(&self, rotations_per_second: f32) -> f32 {
        let speed = self.raw_speed(rotations_per_second);
        if speed <= self.noise_floor { 0.0 } else { speed }
    }
}

/// Anemometer timing and calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnemometerSettings {
    pub debounce: Duration,
    pub window: Duration,
    pub calibration: Calibration,
}

/// Rotations per second for `pulses` counted over `window`
pub fn rotations_per_second(pulses: u32, window: Duration) -> f32 {
    let micros = window.as_micros();
    if micros == 0 {
        return 0.0;
    }
    pulses as f32 / (micros as f32 / 1_000_000.0)
}

/// Integration state for the current anemometer window
#[derive(Debug, Clone, Copy)]
pub struct AnemometerWindow {
    pulse_count: u32,
    window_start: Instant,
    last_accepted_edge: Option<Instant>,
    last_committed_speed: f32,
    publish_pending: bool,
}

impl AnemometerWindow {
    fn new(now: Instant) -> Self {
        Self {
            pulse_count: 0,
            window_start: now,
            last_accepted_edge: None,
            last_committed_speed: 0.0,
            publish_pending: false,
        }
    }

    /// Count an edge unless it falls within `debounce` of the last accepted one.
    fn register_edge(&mut self, edge: Instant, debounce: Duration) -> bool {
        let accepted = match self.last_accepted_edge {
            None => true,
            Some(previous) => edge.saturating_duration_since(previous) >= debounce,
        };

        if accepted {
            self.pulse_count = self.pulse_count.saturating_add(1);
            self.last_accepted_edge = Some(edge);
        }
        accepted
    }

    fn commit(&mut self, speed: f32) {
        self.last_committed_speed = speed;
        self.publish_pending = true;
    }

    fn take_pending(&mut self) -> Option<f32> {
        if core::mem::take(&mut self.publish_pending) {
            Some(self.last_committed_speed)
        } else {
            None
        }
    }
}

/// Cup anemometer driver
pub struct Anemometer<'a, I> {
    latch: &'a EdgeLatch,
    interrupt: I,
    settings: AnemometerSettings,
    window: AnemometerWindow,
}

impl<'a, I: EdgeInterrupt> Anemometer<'a, I> {
    /// Create the driver and arm the edge interrupt. The first window starts at `now`.
    pub fn new(
        latch: &'a EdgeLatch,
        mut interrupt: I,
        settings: AnemometerSettings,
        now: Instant,
    ) -> Self {
        // Drop anything latched before the driver existed
        let _ = latch.take();
        interrupt.enable();

        Self {
            latch,
            interrupt,
            settings,
            window: AnemometerWindow::new(now),
        }
    }

    /// Integrate latched edges and, when the window has elapsed, return the
    /// newly committed wind speed in m/s.
    ///
    /// Returns `Some` at most once per closed window.
    pub fn poll(&mut self, now: Instant) -> Option<f32> {
        if let Some(edge) = self.latch.take() {
            if !self.window.register_edge(edge, self.settings.debounce) {
                debug!("Anemometer: edge at {} us debounced", edge.as_micros());
            }
        }

        if now.saturating_duration_since(self.window.window_start) < self.settings.window {
            return None;
        }

        self.close_window(now)
    }

    fn close_window(&mut self, now: Instant) -> Option<f32> {
        self.interrupt.disable();

        let window = &mut self.window;
        let settings = &self.settings;
        let (pulses, speed) = critical_section::with(|_| {
            let pulses = window.pulse_count;
            let rps = rotations_per_second(pulses, settings.window);
            let speed = settings.calibration.speed(rps);

            window.pulse_count = 0;
            window.window_start = now;
            window.commit(speed);
            (pulses, speed)
        });

        self.interrupt.enable();

        info!("Anemometer: {} pulses in window -> {} m/s", pulses, speed);
        self.window.take_pending()
    }

    /// Pulses counted so far in the current window
    pub fn pulse_count(&self) -> u32 {
        self.window.pulse_count
    }

    /// Most recently committed wind speed in m/s
    pub fn last_speed(&self) -> f32 {
        self.window.last_committed_speed
    }

    pub fn settings(&self) -> &AnemometerSettings {
        &self.settings
    }

    pub fn interrupt(&self) -> &I {
        &self.interrupt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEdgeInterrupt;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn anemometer(latch: &EdgeLatch) -> Anemometer<'_, MockEdgeInterrupt> {
        Anemometer::new(
            latch,
            MockEdgeInterrupt::new(),
            AnemometerSettings::default(),
            at(0),
        )
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_rotations_per_second() {
        let window = Duration::from_secs(10);
        assert_eq!(rotations_per_second(0, window), 0.0);
        assert!(approx(rotations_per_second(25, window), 2.5));
        assert!(approx(rotations_per_second(100, window), 10.0));
        assert_eq!(rotations_per_second(5, Duration::from_ticks(0)), 0.0);
    }

    #[test]
    fn test_calibration_clamps_at_noise_floor() {
        let cal = Calibration::DEFAULT;
        // Root of raw_speed(r) = 1.5 is just above r = 0.068
        assert_eq!(cal.speed(0.0), 0.0);
        assert_eq!(cal.speed(0.05), 0.0);
        assert_eq!(cal.speed(0.068), 0.0);
        assert!(cal.raw_speed(0.0) > 1.4 && cal.raw_speed(0.0) <= 1.5);
    }

    #[test]
    fn test_calibration_polynomial() {
        let cal = Calibration::DEFAULT;
        // 1 pulse per 10 s window
        assert!(approx(cal.speed(0.1), 1.543909));
        // 100 pulses per 10 s window
        assert!(approx(cal.speed(10.0), 13.4545));
    }

    #[test]
    fn test_edges_closer_than_debounce_count_once() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        latch.on_edge(at(100));
        anemometer.poll(at(100));
        latch.on_edge(at(103));
        anemometer.poll(at(103));

        assert_eq!(anemometer.pulse_count(), 1);
    }

    #[test]
    fn test_edges_at_debounce_interval_count_twice() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        latch.on_edge(at(100));
        anemometer.poll(at(100));
        latch.on_edge(at(105));
        anemometer.poll(at(105));

        assert_eq!(anemometer.pulse_count(), 2);
    }

    #[test]
    fn test_poll_without_edge_counts_nothing() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        for ms in (0..1000).step_by(2) {
            assert_eq!(anemometer.poll(at(ms)), None);
        }
        assert_eq!(anemometer.pulse_count(), 0);
    }

    #[test]
    fn test_edge_latched_before_driver_is_ignored() {
        let latch = EdgeLatch::new();
        latch.on_edge(at(0));
        let mut anemometer = anemometer(&latch);

        anemometer.poll(at(1));
        assert_eq!(anemometer.pulse_count(), 0);
    }

    #[test]
    fn test_window_close_publishes_calibrated_speed() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        // 100 pulses, 50 ms apart
        for i in 0..100u64 {
            latch.on_edge(at(10 + i * 50));
            assert_eq!(anemometer.poll(at(10 + i * 50)), None);
        }
        assert_eq!(anemometer.pulse_count(), 100);

        let speed = anemometer.poll(at(10_000)).expect("window should close");
        assert!(approx(speed, 13.4545));
        assert_eq!(anemometer.pulse_count(), 0);
        assert!(approx(anemometer.last_speed(), 13.4545));
    }

    #[test]
    fn test_silent_window_publishes_zero() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        assert_eq!(anemometer.poll(at(10_000)), Some(0.0));
    }

    #[test]
    fn test_publishes_at_most_once_per_window() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        let mut published = 0;
        // 5 windows polled every 2 ms
        for ms in (0..=50_000u64).step_by(2) {
            if anemometer.poll(at(ms)).is_some() {
                published += 1;
            }
        }
        assert_eq!(published, 5);
    }

    #[test]
    fn test_window_close_disables_and_reenables_interrupt() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);
        assert_eq!(anemometer.interrupt().enable_count(), 1);

        anemometer.poll(at(10_000));
        anemometer.poll(at(20_000));

        let irq = anemometer.interrupt();
        assert_eq!(irq.disable_count(), 2);
        assert_eq!(irq.enable_count(), 3);
        assert!(irq.is_enabled());
    }

    #[test]
    fn test_debounce_spans_window_boundary() {
        let latch = EdgeLatch::new();
        let mut anemometer = anemometer(&latch);

        latch.on_edge(at(9_999));
        anemometer.poll(at(9_999));
        assert!(anemometer.poll(at(10_000)).is_some());

        // 2 ms after the last accepted edge, still bounce
        latch.on_edge(at(10_001));
        anemometer.poll(at(10_001));
        assert_eq!(anemometer.pulse_count(), 0);
    }

    #[test]
    fn test_latch_take_clears_flag() {
        let latch = EdgeLatch::new();
        assert_eq!(latch.take(), None);

        latch.on_edge(at(7));
        latch.on_edge(at(9));
        assert_eq!(latch.take(), Some(at(9)));
        assert_eq!(latch.take(), None);
    }
}
