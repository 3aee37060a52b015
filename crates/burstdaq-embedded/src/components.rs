//! Peripheral adapters: status LEDs, the ADC burst source, and the
//! control-loop side of the shared host UART.

// SPDX-License-Identifier: Apache-2.0

use defmt::debug;
use embedded_hal::digital::{OutputPin, PinState};

use burstdaq_core::peripheral::{HostLink, Indicator, SampleSource, StatusPattern};
use rp2040_hal::{
    adc::AdcPin,
    gpio::{
        bank0::{Gpio26, Gpio6, Gpio7, Gpio8},
        FunctionNull, FunctionSio, Pin, PullDown, PullNone, SioInput, SioOutput,
    },
    Adc,
};

use crate::interrupt::HOST_UART;

/// The three status LEDs, one per control state.
///
/// Red on GPIO6 = idle, amber on GPIO7 = sampling, green on GPIO8 =
/// transfer. Exactly one is lit once the control loop is running.
pub struct StatusLeds {
    /// Pattern currently displayed, to avoid rewriting pins every tick.
    current: Option<StatusPattern>,
    idle_led: Pin<Gpio6, FunctionSio<SioOutput>, PullDown>,
    sampling_led: Pin<Gpio7, FunctionSio<SioOutput>, PullDown>,
    transfer_led: Pin<Gpio8, FunctionSio<SioOutput>, PullDown>,
}

impl StatusLeds {
    /// Claim the LED pins, all dark until the first tick.
    pub fn new(
        idle_led: Pin<Gpio6, FunctionNull, PullDown>,
        sampling_led: Pin<Gpio7, FunctionNull, PullDown>,
        transfer_led: Pin<Gpio8, FunctionNull, PullDown>,
    ) -> Self {
        Self {
            current: None,
            idle_led: idle_led.into_push_pull_output_in_state(PinState::Low),
            sampling_led: sampling_led.into_push_pull_output_in_state(PinState::Low),
            transfer_led: transfer_led.into_push_pull_output_in_state(PinState::Low),
        }
    }
}

impl Indicator for StatusLeds {
    fn show(&mut self, pattern: StatusPattern) {
        if self.current == Some(pattern) {
            return;
        }
        debug!("indicator: {}", pattern);
        self.current = Some(pattern);

        // Pin errors are infallible on this part.
        self.idle_led
            .set_state(PinState::from(pattern == StatusPattern::Idle))
            .unwrap();
        self.sampling_led
            .set_state(PinState::from(pattern == StatusPattern::Sampling))
            .unwrap();
        self.transfer_led
            .set_state(PinState::from(pattern == StatusPattern::Transfer))
            .unwrap();
    }
}

/// One-shot ADC conversions on GPIO26.
pub struct BurstAdc {
    /// The ADC block.
    adc: Adc,
    /// Analog input carrying the conditioned detector signal.
    pin: AdcPin<Pin<Gpio26, FunctionSio<SioInput>, PullNone>>,
}

impl BurstAdc {
    /// Wrap the claimed ADC and input pin.
    pub fn new(adc: Adc, pin: AdcPin<Pin<Gpio26, FunctionSio<SioInput>, PullNone>>) -> Self {
        Self { adc, pin }
    }
}

impl SampleSource for BurstAdc {
    fn start_conversion(&mut self) {
        // One-shot conversions are started by the read itself; nothing to
        // arm ahead of time.
    }

    fn try_result(&mut self) -> Option<u16> {
        // `read_single` blocks for the conversion (~2 us), so the result
        // is complete by the time it returns.
        Some(self.adc.read_single(&self.pin))
    }
}

/// Control-loop side of the host UART shared with the RX interrupt.
///
/// Every access takes a short critical section; transmission itself is
/// drained by the UART hardware, so holding the section while the FIFO
/// accepts a byte cannot deadlock.
pub struct UartLink;

impl HostLink for UartLink {
    fn send_byte(&mut self, byte: u8) {
        critical_section::with(|cs| {
            if let Some(uart) = HOST_UART.borrow_ref_mut(cs).as_mut() {
                uart.write_full_blocking(&[byte]);
            }
        });
    }

    fn take_byte(&mut self) -> Option<u8> {
        critical_section::with(|cs| {
            let mut uart = HOST_UART.borrow_ref_mut(cs);
            let uart = uart.as_mut()?;
            if !uart.uart_is_readable() {
                return None;
            }
            let mut byte = [0u8; 1];
            if uart.read_raw(&mut byte).is_ok() {
                Some(byte[0])
            } else {
                None
            }
        })
    }
}
