//! Interrupt handlers, plus the static cells shared with them.
//!
//! Interrupt context does exactly two things: acknowledge its source and
//! raise a latch in [`EVENTS`]. Debouncing, sequencing, and consuming the
//! latches all happen in the control loop.

use core::cell::RefCell;

use critical_section::Mutex;

use burstdaq_core::signal::EventLatches;
use rp2040_hal::{
    gpio::{
        bank0::{Gpio0, Gpio1, Gpio15},
        FunctionSio, FunctionUart, Interrupt as GpioInterrupt, Pin, PullDown, PullUp, SioInput,
    },
    pac::{self, interrupt},
    uart::{Enabled, UartPeripheral},
};

/// Trigger push-button input, held here so the edge handler can
/// acknowledge the interrupt.
pub type TriggerPin = Pin<Gpio15, FunctionSio<SioInput>, PullUp>;

/// Host serial link on UART0, TX/RX on GPIO0/GPIO1.
pub type HostUart = UartPeripheral<
    Enabled,
    pac::UART0,
    (
        Pin<Gpio0, FunctionUart, PullDown>,
        Pin<Gpio1, FunctionUart, PullDown>,
    ),
>;

/// Event latches raised here and consumed by the control loop.
pub static EVENTS: EventLatches = EventLatches::new();

/// Trigger pin for access in the edge interrupt.
pub static TRIGGER_PIN: Mutex<RefCell<Option<TriggerPin>>> = Mutex::new(RefCell::new(None));

/// Host UART, shared between the RX interrupt and the control loop's link
/// adapter.
pub static HOST_UART: Mutex<RefCell<Option<HostUart>>> = Mutex::new(RefCell::new(None));

/// Trigger edge: latch the press and acknowledge. Edges arriving while the
/// latch is already set coalesce into one pending press.
#[allow(non_snake_case)]
#[interrupt]
fn IO_IRQ_BANK0() {
    critical_section::with(|cs| {
        if let Some(pin) = TRIGGER_PIN.borrow_ref_mut(cs).as_mut() {
            if pin.interrupt_status(GpioInterrupt::EdgeLow) {
                EVENTS.signal_trigger();
                pin.clear_interrupt(GpioInterrupt::EdgeLow);
            }
        }
    });
}

/// Host byte received: drain the FIFO and classify each byte. Unrecognized
/// bytes are dropped here, silently. Draining the FIFO clears the
/// interrupt condition.
#[allow(non_snake_case)]
#[interrupt]
fn UART0_IRQ() {
    critical_section::with(|cs| {
        if let Some(uart) = HOST_UART.borrow_ref_mut(cs).as_mut() {
            let mut byte = [0u8; 1];
            while uart.uart_is_readable() {
                if uart.read_raw(&mut byte).is_err() {
                    break;
                }
                EVENTS.record_byte(byte[0]);
            }
        }
    });
}
