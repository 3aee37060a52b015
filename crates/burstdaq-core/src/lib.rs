//! Hardware-independent control core for the burstdaq capture tool: a
//! microcontroller device that records a fixed-size burst of analog samples
//! on a physical trigger and streams it to a host over a serial link, one
//! batch at a time, under host-driven handshake control.
//!
//! The crate owns everything that can be exercised without hardware:
//!
//! - [`control`]: the Idle → Sampling → Transfer state machine driven by
//!   [`Controller::tick`](control::Controller::tick)
//! - [`signal`]: interrupt-to-loop event latches ([`signal::EventLatches`])
//! - [`buffer`]: the fixed-capacity acquisition buffer
//! - [`sampler`] / [`transfer`]: batch fill and batch emission
//! - [`peripheral`]: the contracts the firmware implements on top of its HAL
//!
//! Interrupt handlers only ever raise latches; the control loop is the sole
//! consumer. The firmware crate (`burstdaq-embedded`) provides the RP2040
//! peripheral implementations and calls `tick()` forever.
//!
//! ## Crate features
//!
//! - `defmt`: derive `defmt::Format` on the public enums so the firmware
//!   can log states, patterns, and commands directly.

// SPDX-License-Identifier: Apache-2.0

#![no_std]
#![warn(missing_docs)]

#[cfg(test)]
extern crate std;

pub mod buffer;
pub mod control;
pub mod peripheral;
pub mod sampler;
pub mod signal;
pub mod transfer;

pub use buffer::SampleBuffer;
pub use control::{Controller, State};
pub use signal::{EventLatches, HostCommand};

/// Samples acquired per batch.
pub const SAMPLES_PER_BATCH: usize = 1024;

/// Maximum batches transferred within one trigger episode. Reaching the
/// bound forces the machine back to idle regardless of host commands.
pub const MAX_BATCHES: u8 = 10;

/// Delay applied after a trigger edge before sampling starts, long enough
/// to outlast mechanical contact bounce.
pub const DEBOUNCE_DELAY_MS: u32 = 300;
