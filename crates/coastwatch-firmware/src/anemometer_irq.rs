//! Anemometer pulse input and its GPIO interrupt
//!
//! The handler only timestamps the rising edge into [`EDGE_LATCH`]; the
//! control loop does debouncing and counting. The input pin lives in a
//! critical-section mutex so the handler and [`PinInterrupt`] can both reach
//! it.

use core::cell::RefCell;

use coastwatch_core::sensors::{EdgeInterrupt, EdgeLatch};
use critical_section::Mutex;
use embassy_time::Instant;
use esp_hal::gpio::{Event, Input, Io};
use esp_hal::{handler, ram};

/// Edge timestamps handed from the interrupt to the control loop
pub static EDGE_LATCH: EdgeLatch = EdgeLatch::new();

static ANEMOMETER_PIN: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

/// Register the GPIO handler and take ownership of the pulse input.
///
/// The pin stays silent until the core anemometer driver enables it.
pub fn install(io: &mut Io<'_>, pin: Input<'static>) -> PinInterrupt {
    io.set_interrupt_handler(anemometer_edge);
    critical_section::with(|cs| {
        ANEMOMETER_PIN.borrow_ref_mut(cs).replace(pin);
    });
    PinInterrupt { _private: () }
}

#[handler]
#[ram]
fn anemometer_edge() {
    let now = Instant::now();
    critical_section::with(|cs| {
        if let Some(pin) = ANEMOMETER_PIN.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                pin.clear_interrupt();
                EDGE_LATCH.on_edge(now);
            }
        }
    });
}

/// Enables and disables rising-edge interrupts on the installed pin
pub struct PinInterrupt {
    _private: (),
}

impl PinInterrupt {
    fn with_pin(&mut self, f: impl FnOnce(&mut Input<'static>)) {
        critical_section::with(|cs| {
            if let Some(pin) = ANEMOMETER_PIN.borrow_ref_mut(cs).as_mut() {
                f(pin);
            }
        });
    }
}

impl EdgeInterrupt for PinInterrupt {
    fn enable(&mut self) {
        self.with_pin(|pin| pin.listen(Event::RisingEdge));
    }

    fn disable(&mut self) {
        self.with_pin(|pin| {
            pin.unlisten();
            pin.clear_interrupt();
        });
    }
}
