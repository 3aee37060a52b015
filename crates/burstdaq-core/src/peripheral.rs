//! Contracts for the peripheral access layer.
//!
//! The firmware implements these on top of its HAL; tests implement them
//! with in-memory fakes. None of them carry sequencing logic; ordering and
//! shared-state discipline live entirely in [`control`](crate::control).

// SPDX-License-Identifier: Apache-2.0

/// Indicator patterns, one per control state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusPattern {
    /// Waiting for a trigger.
    Idle,
    /// Acquisition in progress.
    Sampling,
    /// Batch going out on the serial link.
    Transfer,
}

/// One-sample-at-a-time analog converter.
///
/// Conversions are started explicitly and polled for completion; the
/// converter is assumed to always complete a started conversion (see
/// [`sampler::acquire_batch`](crate::sampler::acquire_batch) for the
/// consequences of that assumption).
pub trait SampleSource {
    /// Begin one conversion.
    fn start_conversion(&mut self);

    /// The completed result, or `None` while the conversion is still
    /// running. Reading the result consumes it.
    fn try_result(&mut self) -> Option<u16>;
}

/// Byte-oriented serial link to the host.
pub trait HostLink {
    /// Hand one byte to the transmitter, blocking until it is accepted.
    /// No acknowledgement is awaited; flow control happens at the
    /// batch-command level.
    fn send_byte(&mut self, byte: u8);

    /// Remove and return one received-but-unread byte, if any is pending.
    /// Never blocks.
    fn take_byte(&mut self) -> Option<u8>;
}

/// State indicator output, three LEDs on the reference hardware.
pub trait Indicator {
    /// Display `pattern` until told otherwise.
    fn show(&mut self, pattern: StatusPattern);
}

impl<T: SampleSource + ?Sized> SampleSource for &mut T {
    fn start_conversion(&mut self) {
        T::start_conversion(self);
    }

    fn try_result(&mut self) -> Option<u16> {
        T::try_result(self)
    }
}

impl<T: HostLink + ?Sized> HostLink for &mut T {
    fn send_byte(&mut self, byte: u8) {
        T::send_byte(self, byte);
    }

    fn take_byte(&mut self) -> Option<u8> {
        T::take_byte(self)
    }
}

impl<T: Indicator + ?Sized> Indicator for &mut T {
    fn show(&mut self, pattern: StatusPattern) {
        T::show(self, pattern);
    }
}
