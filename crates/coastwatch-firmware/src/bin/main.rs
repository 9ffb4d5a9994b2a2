#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use coastwatch_core::config::{POLL_PERIOD, StationConfig};
use coastwatch_core::sensors::NotFitted;
use coastwatch_core::{Station, StationParts};
use coastwatch_firmware::anemometer_irq;
use coastwatch_firmware::board::{self, SerialPins};
use coastwatch_firmware::serial::DiagnosticPort;
use coastwatch_firmware::station_id::STATION_ID;
use embassy_executor::Spawner;
use embassy_time::{Instant, Ticker};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Io;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::usb_serial_jtag::UsbSerialJtag;
use log::{error, info};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 32768);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    // Anemometer pulse input and its edge interrupt
    let mut io = Io::new(peripherals.IO_MUX);
    let pulse_input = board::anemometer_input(peripherals.GPIO14);
    let edge_interrupt = anemometer_irq::install(&mut io, pulse_input);

    let ports = board::init_serial_ports(SerialPins {
        tide_uart: peripherals.UART0,
        tide_rx: peripherals.GPIO13,
        tide_tx: peripherals.GPIO12,
        direction_uart: peripherals.UART1,
        direction_rx: peripherals.GPIO4,
        direction_tx: peripherals.GPIO2,
        lora_uart: peripherals.UART2,
        lora_rx: peripherals.GPIO16,
        lora_tx: peripherals.GPIO17,
    })
    .expect("Failed to configure UARTs");

    let diagnostic = DiagnosticPort::new(UsbSerialJtag::new(peripherals.USB_DEVICE));

    let station_config = StationConfig::with_station_id(STATION_ID);
    let parts = StationParts {
        edge_latch: &anemometer_irq::EDGE_LATCH,
        edge_interrupt,
        tide_stream: Some(ports.tide),
        direction_stream: Some(ports.wind_direction),
        // The BME280 is not populated on this board revision
        environment: None::<NotFitted>,
        radio: ports.lora,
        diagnostic,
    };
    let mut station =
        Station::new(parts, &station_config, Instant::now()).expect("Invalid station id");

    info!("Station '{}' running", STATION_ID);

    let mut ticker = Ticker::every(POLL_PERIOD);
    loop {
        if let Err(e) = station.tick(Instant::now()).await {
            error!("Station: {}", e);
        }
        ticker.next().await;
    }
}
