//! Interrupt-to-loop event signalling.
//!
//! Each asynchronous input (the trigger edge and the two recognized host
//! command bytes) is bridged into the control loop through a [`SignalCell`]:
//! a boolean latch with exactly one writer (an interrupt handler) and one
//! clearer (the state that consumes the event). Events arriving while the
//! latch is already set coalesce into a single pending event; that is the
//! intended debounce-by-coalescing behaviour, not a loss.

// SPDX-License-Identifier: Apache-2.0

use core::cell::Cell;

use critical_section::Mutex;

/// Single-writer, single-clearer boolean latch.
///
/// [`raise`](Self::raise) is safe to call from interrupt context: it takes a
/// short critical section, performs one store, and never blocks.
/// [`take`](Self::take) atomically tests and clears, so the loop observes
/// each pending event exactly once.
pub struct SignalCell(Mutex<Cell<bool>>);

impl SignalCell {
    /// New latch in the cleared state.
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(false)))
    }

    /// Record one occurrence. Occurrences while already set coalesce.
    pub fn raise(&self) {
        critical_section::with(|cs| self.0.borrow(cs).set(true));
    }

    /// Atomically test and clear, returning whether an event was pending.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.0.borrow(cs).replace(false))
    }
}

impl Default for SignalCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Host commands recognized on the serial link.
///
/// ```
/// use burstdaq_core::signal::HostCommand;
///
/// assert_eq!(HostCommand::classify(b's'), Some(HostCommand::StartTransfer));
/// assert_eq!(HostCommand::classify(b'x'), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand {
    /// `'s'`: the host is ready to receive the sampled batch. Consumed
    /// only while in the sampling state.
    StartTransfer,
    /// `'o'`: the host acknowledges a batch and asks for the next one (or
    /// ends the episode once the batch bound is reached). Consumed only
    /// while in the transfer state.
    Proceed,
}

impl HostCommand {
    /// Classify a received byte. Anything unrecognized yields `None` and is
    /// silently discarded by the caller.
    pub const fn classify(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Self::StartTransfer),
            b'o' => Some(Self::Proceed),
            _ => None,
        }
    }
}

/// The full set of latches shared between interrupt context and the loop.
///
/// The firmware keeps one static instance; interrupt handlers hold only a
/// reference to it, never to the state machine that consumes it.
pub struct EventLatches {
    /// Physical trigger edge since last idle poll.
    trigger: SignalCell,
    /// `'s'` received since last consumed.
    start_transfer: SignalCell,
    /// `'o'` received since last consumed.
    proceed: SignalCell,
}

impl EventLatches {
    /// All latches cleared.
    pub const fn new() -> Self {
        Self {
            trigger: SignalCell::new(),
            start_transfer: SignalCell::new(),
            proceed: SignalCell::new(),
        }
    }

    /// Called from the trigger-edge interrupt handler.
    pub fn signal_trigger(&self) {
        self.trigger.raise();
    }

    /// Called from the serial RX interrupt handler with each received byte.
    /// Recognized command bytes raise their latch; everything else is
    /// dropped without effect.
    pub fn record_byte(&self, byte: u8) {
        if let Some(command) = HostCommand::classify(byte) {
            self.signal_command(command);
        }
    }

    /// Raise one command latch directly. Interrupt side only.
    pub fn signal_command(&self, command: HostCommand) {
        self.command_cell(command).raise();
    }

    /// Test-and-clear the trigger latch. Loop side only.
    pub fn take_trigger(&self) -> bool {
        self.trigger.take()
    }

    /// Test-and-clear one command latch. Loop side only.
    pub fn take_command(&self, command: HostCommand) -> bool {
        self.command_cell(command).take()
    }

    /// Latch belonging to a command kind.
    fn command_cell(&self, command: HostCommand) -> &SignalCell {
        match command {
            HostCommand::StartTransfer => &self.start_transfer,
            HostCommand::Proceed => &self.proceed,
        }
    }
}

impl Default for EventLatches {
    fn default() -> Self {
        Self::new()
    }
}
