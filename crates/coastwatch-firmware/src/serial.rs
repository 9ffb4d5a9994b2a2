//! `embedded-io` adapters over the esp-hal serial drivers
//!
//! The core reads and writes through `embedded_io::{Read, ReadReady, Write}`.
//! These wrappers expose the blocking UART and USB-Serial-JTAG drivers
//! through those traits, reporting failures as [`ErrorKind`].

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use esp_hal::Blocking;
use esp_hal::uart::Uart;
use esp_hal::usb_serial_jtag::UsbSerialJtag;
use log::trace;

/// Blocking UART used by the tide gauge, the wind vane and the LoRa module
pub struct SerialPort<'d> {
    uart: Uart<'d, Blocking>,
}

impl<'d> SerialPort<'d> {
    pub fn new(uart: Uart<'d, Blocking>) -> Self {
        Self { uart }
    }
}

impl ErrorType for SerialPort<'_> {
    type Error = ErrorKind;
}

impl Read for SerialPort<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.uart.read(buf).map_err(|e| {
            trace!("UART read error: {:?}", e);
            ErrorKind::Other
        })
    }
}

impl ReadReady for SerialPort<'_> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.uart.read_ready())
    }
}

impl Write for SerialPort<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write(buf).map_err(|e| {
            trace!("UART write error: {:?}", e);
            ErrorKind::Other
        })
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush().map_err(|_| ErrorKind::Other)
    }
}

/// USB-Serial-JTAG port mirroring the uplink for a laptop on the bench
///
/// Writes never wait for the host. Bytes that do not fit the endpoint FIFO
/// are dropped, so a station with nothing plugged in keeps running.
pub struct DiagnosticPort<'d> {
    usb: UsbSerialJtag<'d, Blocking>,
}

impl<'d> DiagnosticPort<'d> {
    pub fn new(usb: UsbSerialJtag<'d, Blocking>) -> Self {
        Self { usb }
    }
}

impl ErrorType for DiagnosticPort<'_> {
    type Error = ErrorKind;
}

impl Write for DiagnosticPort<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let written = buf
            .iter()
            .take_while(|&&byte| self.usb.write_byte_nb(byte).is_ok())
            .count();
        if written < buf.len() {
            trace!("USB FIFO full, {} bytes dropped", buf.len() - written);
        }
        // Hand the packet to the host if one is polling
        if self.usb.flush_tx_nb().is_err() {
            trace!("USB packet pending");
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.usb.flush_tx_nb().map_err(|_| ErrorKind::Other)
    }
}
