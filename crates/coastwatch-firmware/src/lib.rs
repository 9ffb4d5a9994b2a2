//! ESP32-S3 firmware-specific modules for coastwatch
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: the anemometer GPIO interrupt, UART and USB-Serial-JTAG adapters
//! for the core's `embedded-io` seams, the board wiring, and the station
//! identifier baked in at build time.

#![no_std]

pub mod anemometer_irq;
pub mod board;
pub mod serial;
pub mod station_id;
