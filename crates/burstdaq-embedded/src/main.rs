//! RP2040 firmware for the burstdaq capture tool: on a push-button trigger
//! it records a 1024-sample burst from the ADC and streams it to the host
//! over UART, one batch per handshake, up to ten batches per trigger.
#![no_std]
#![no_main]
#![warn(missing_docs)]

use burstdaq_core::{buffer::SampleBuffer, control::Controller};
use cortex_m::singleton;
use defmt::{debug, info};
#[allow(unused_imports)]
use defmt_rtt as _;
#[allow(unused_imports)]
use panic_probe as _;
use rp2040_hal::{
    adc::AdcPin,
    clocks::init_clocks_and_plls,
    entry,
    fugit::RateExtU32,
    gpio::{Interrupt as GpioInterrupt, Pins},
    pac,
    prelude::*,
    uart::{DataBits, StopBits, UartConfig, UartPeripheral},
    Adc, Sio, Timer, Watchdog,
};

use crate::components::{BurstAdc, StatusLeds, UartLink};
use crate::interrupt::{EVENTS, HOST_UART, TRIGGER_PIN};

mod components;
mod interrupt;

/// Second-stage bootloader, from [rp2040-boot2](https://docs.rs/rp2040-boot2)
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// External high-speed crystal on the board is 12 MHz
pub const XOSC_FREQ_HZ: u32 = 12_000_000;
/// Host link baud rate
pub const HOST_BAUD_HZ: u32 = 115_200;

/// Bring-up, then the control loop forever
#[entry]
fn main() -> ! {
    info!("burst capture startup");
    let mut pac = pac::Peripherals::take().unwrap();
    let _core = pac::CorePeripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let sio = Sio::new(pac.SIO);

    let clocks = init_clocks_and_plls(
        XOSC_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Status LEDs
    let leds = StatusLeds::new(pins.gpio6, pins.gpio7, pins.gpio8);

    // Host UART, receive side serviced by UART0_IRQ
    let uart_pins = (pins.gpio0.into_function(), pins.gpio1.into_function());
    let mut uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(HOST_BAUD_HZ.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();
    uart.enable_rx_interrupt();
    debug!("critical_section: install host uart");
    critical_section::with(|cs| {
        HOST_UART.replace(cs, Some(uart));
    });

    // Trigger push-button, falling edge on press
    let trigger = pins.gpio15.into_pull_up_input();
    trigger.set_interrupt_enabled(GpioInterrupt::EdgeLow, true);
    debug!("critical_section: install trigger pin");
    critical_section::with(|cs| {
        TRIGGER_PIN.replace(cs, Some(trigger));
    });

    // ADC source and the acquisition buffer
    let adc = Adc::new(pac.ADC, &mut pac.RESETS);
    let adc_pin = AdcPin::new(pins.gpio26.into_floating_input()).unwrap();
    let source = BurstAdc::new(adc, adc_pin);
    let buffer = singleton!(: SampleBuffer = SampleBuffer::new()).unwrap();

    // Statics are populated; let the interrupts in.
    unsafe {
        pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
        pac::NVIC::unmask(pac::Interrupt::UART0_IRQ);
    }

    let mut controller = Controller::new(&EVENTS, buffer, source, UartLink, leds, timer);
    info!(
        "entering control loop: {} samples per batch, up to {} batches per trigger",
        burstdaq_core::SAMPLES_PER_BATCH,
        burstdaq_core::MAX_BATCHES
    );
    loop {
        let previous = controller.state();
        controller.tick();
        let current = controller.state();
        if current != previous {
            debug!(
                "state: {} -> {} ({} batches this episode)",
                previous,
                current,
                controller.batches_sent()
            );
        }
    }
}
