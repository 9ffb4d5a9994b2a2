//! Hardware-independent core library for coastwatch
//!
//! This crate contains the platform-agnostic logic of the coastwatch station:
//! the pulse-rate anemometer driver, the tide and wind-direction serial frame
//! parsers, the telemetry aggregator and uplink encoder, the sailing
//! feasibility evaluator, and the `Station` control loop that ties them
//! together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod feasibility;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod sensors;
pub mod telemetry;

pub use app_state::{AppError, Station, StationParts, StationRunState, Transmission};
pub use config::StationConfig;
pub use feasibility::{Verdict, evaluate};
pub use telemetry::{TelemetryRecord, TelemetryUpdate};
