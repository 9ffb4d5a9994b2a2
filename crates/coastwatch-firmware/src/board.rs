//! Board wiring for the coastwatch station
//!
//! | Signal              | Peripheral | GPIO                       |
//! |---------------------|------------|----------------------------|
//! | Anemometer pulse    | GPIO       | 14 (pull-up, rising edge)  |
//! | Tide gauge          | UART0      | RX 13 / TX 12              |
//! | Wind direction vane | UART1      | RX 4 / TX 2                |
//! | LoRa module         | UART2      | RX 16 / TX 17              |
//! | Diagnostic mirror   | USB-JTAG   | internal                   |
//!
//! All UARTs run at [`SERIAL_BAUD`].

use coastwatch_core::config::SERIAL_BAUD;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::peripherals::{
    GPIO2, GPIO4, GPIO12, GPIO13, GPIO14, GPIO16, GPIO17, UART0, UART1, UART2,
};
use esp_hal::uart::{Config as UartConfig, ConfigError, Uart};
use log::info;

use crate::serial::SerialPort;

/// The three station UARTs, ready for the core
pub struct SerialPorts {
    pub tide: SerialPort<'static>,
    pub wind_direction: SerialPort<'static>,
    pub lora: SerialPort<'static>,
}

/// Pins and UART peripherals the station's serial devices are wired to
pub struct SerialPins {
    pub tide_uart: UART0<'static>,
    pub tide_rx: GPIO13<'static>,
    pub tide_tx: GPIO12<'static>,
    pub direction_uart: UART1<'static>,
    pub direction_rx: GPIO4<'static>,
    pub direction_tx: GPIO2<'static>,
    pub lora_uart: UART2<'static>,
    pub lora_rx: GPIO16<'static>,
    pub lora_tx: GPIO17<'static>,
}

/// Configure the tide, wind-direction and LoRa UARTs
pub fn init_serial_ports(pins: SerialPins) -> Result<SerialPorts, ConfigError> {
    let config = UartConfig::default().with_baudrate(SERIAL_BAUD);

    let tide = Uart::new(pins.tide_uart, config)?
        .with_rx(pins.tide_rx)
        .with_tx(pins.tide_tx);
    let wind_direction = Uart::new(pins.direction_uart, config)?
        .with_rx(pins.direction_rx)
        .with_tx(pins.direction_tx);
    let lora = Uart::new(pins.lora_uart, config)?
        .with_rx(pins.lora_rx)
        .with_tx(pins.lora_tx);

    info!("UARTs configured at {} baud", SERIAL_BAUD);

    Ok(SerialPorts {
        tide: SerialPort::new(tide),
        wind_direction: SerialPort::new(wind_direction),
        lora: SerialPort::new(lora),
    })
}

/// Anemometer pulse input with the internal pull-up enabled
pub fn anemometer_input(pin: GPIO14<'static>) -> Input<'static> {
    Input::new(pin, InputConfig::default().with_pull(Pull::Up))
}
