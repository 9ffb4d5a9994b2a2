//! Links the esp-hal memory layout and bakes the station identifier from
//! `.env` into the binary.

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");

    // A missing .env is fine: the firmware falls back to the default id
    let _ = dotenvy::dotenv();
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=STATION_ID");

    if let Ok(station_id) = std::env::var("STATION_ID") {
        println!("cargo:rustc-env=COASTWATCH_STATION_ID={station_id}");
    }
}
