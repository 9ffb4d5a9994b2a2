//! Station identifier baked in at build time

use coastwatch_core::config::DEFAULT_STATION_ID;

/// Station identifier sent as the first uplink field.
///
/// Taken from `STATION_ID` in `.env` at build time, see `build.rs`.
pub const STATION_ID: &str = match option_env!("COASTWATCH_STATION_ID") {
    Some(id) => id,
    None => DEFAULT_STATION_ID,
};
