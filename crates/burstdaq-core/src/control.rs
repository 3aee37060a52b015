//! The acquisition/transfer state machine.
//!
//! One [`Controller`] owns the peripherals and the acquisition buffer and
//! is driven by calling [`tick`](Controller::tick) forever. Interrupt
//! handlers never touch it; they only raise the [`EventLatches`] it polls.

// SPDX-License-Identifier: Apache-2.0

use embedded_hal::delay::DelayNs;

use crate::{
    buffer::SampleBuffer,
    peripheral::{HostLink, Indicator, SampleSource, StatusPattern},
    sampler,
    signal::{EventLatches, HostCommand},
    transfer, DEBOUNCE_DELAY_MS, MAX_BATCHES,
};

/// Control-loop states. The machine is always in exactly one of these, and
/// every state/signal combination has a defined successor, so nothing can
/// get stuck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Waiting for a trigger edge.
    Idle,
    /// Filling the acquisition buffer.
    Sampling,
    /// Streaming the buffer to the host.
    Transfer,
}

/// Completed-batch counter for the current episode, bounded by
/// [`MAX_BATCHES`].
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchCounter(u8);

impl BatchCounter {
    /// Current count.
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Back to zero, on idle entry.
    fn reset(&mut self) {
        self.0 = 0;
    }

    /// One more batch completed.
    fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// Whether the episode bound has been reached.
    fn limit_reached(&self) -> bool {
        self.0 >= MAX_BATCHES
    }
}

/// The acquisition/transfer state machine.
///
/// Single-threaded by construction: the control loop is the only context
/// that runs `tick()`, blocks, or touches the buffer. The latches are the
/// only state shared with interrupt context.
pub struct Controller<'a, S, L, I, D> {
    /// Current state; updated only at the end of each tick.
    state: State,
    /// Batches completed in the current episode.
    batches: BatchCounter,
    /// Latches raised by interrupt handlers.
    events: &'a EventLatches,
    /// Acquisition storage, written in Sampling and read in Transfer.
    buffer: &'a mut SampleBuffer,
    /// Analog converter.
    source: S,
    /// Serial link to the host.
    link: L,
    /// State indicator output.
    indicator: I,
    /// Debounce delay provider.
    delay: D,
}

impl<'a, S, L, I, D> Controller<'a, S, L, I, D>
where
    S: SampleSource,
    L: HostLink,
    I: Indicator,
    D: DelayNs,
{
    /// New machine in [`State::Idle`] with an empty episode.
    pub fn new(
        events: &'a EventLatches,
        buffer: &'a mut SampleBuffer,
        source: S,
        link: L,
        indicator: I,
        delay: D,
    ) -> Self {
        Self {
            state: State::Idle,
            batches: BatchCounter::default(),
            events,
            buffer,
            source,
            link,
            indicator,
            delay,
        }
    }

    /// Current state, for logging and inspection.
    pub fn state(&self) -> State {
        self.state
    }

    /// Batches completed so far in the current episode.
    pub fn batches_sent(&self) -> u8 {
        self.batches.get()
    }

    /// The most recently acquired batch.
    pub fn buffer(&self) -> &SampleBuffer {
        self.buffer
    }

    /// Run exactly one iteration: perform the current state's action,
    /// evaluate the transition conditions, and update the state.
    pub fn tick(&mut self) {
        self.state = match self.state {
            State::Idle => self.idle_tick(),
            State::Sampling => self.sampling_tick(),
            State::Transfer => self.transfer_tick(),
        };
    }

    /// Idle: housekeep the episode, then leave on a pending trigger.
    fn idle_tick(&mut self) -> State {
        self.indicator.show(StatusPattern::Idle);
        self.batches.reset();
        // Drop host bytes left over from an aborted or completed episode so
        // a stale command cannot leak into the next one.
        while self.link.take_byte().is_some() {}

        if self.events.take_trigger() {
            self.delay.delay_ms(DEBOUNCE_DELAY_MS);
            // Edges latched during the delay are contact bounce from the
            // same press; swallow them instead of starting a second episode.
            let _ = self.events.take_trigger();
            State::Sampling
        } else {
            State::Idle
        }
    }

    /// Sampling: acquire a full batch, then see whether the host wants it.
    fn sampling_tick(&mut self) -> State {
        self.indicator.show(StatusPattern::Sampling);
        sampler::acquire_batch(&mut self.source, self.buffer);

        // The host is expected to have requested the data by now; silence
        // means it is absent or not ready, so the episode aborts rather
        // than waiting.
        if self.events.take_command(HostCommand::StartTransfer) {
            State::Transfer
        } else {
            State::Idle
        }
    }

    /// Transfer: stream the batch out, then continue, finish, or abort.
    fn transfer_tick(&mut self) -> State {
        self.indicator.show(StatusPattern::Transfer);
        transfer::send_batch(&mut self.link, self.buffer);
        self.batches.increment();

        if !self.events.take_command(HostCommand::Proceed) {
            return State::Idle;
        }
        if self.batches.limit_reached() {
            State::Idle
        } else {
            State::Sampling
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, vec::Vec};

    use super::*;
    use crate::{SAMPLES_PER_BATCH, MAX_BATCHES};

    /// Converter producing an incrementing ramp, one poll per sample.
    struct RampSource {
        next: u16,
    }

    impl RampSource {
        fn new() -> Self {
            Self { next: 0 }
        }
    }

    impl SampleSource for RampSource {
        fn start_conversion(&mut self) {}

        fn try_result(&mut self) -> Option<u16> {
            let sample = self.next;
            self.next = self.next.wrapping_add(1);
            Some(sample)
        }
    }

    /// In-memory serial link: scripted receive queue, recorded transmit.
    struct PipeLink {
        rx: VecDeque<u8>,
        sent: Vec<u8>,
    }

    impl PipeLink {
        fn new() -> Self {
            Self {
                rx: VecDeque::new(),
                sent: Vec::new(),
            }
        }
    }

    impl HostLink for PipeLink {
        fn send_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }

        fn take_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
    }

    /// Records every pattern the machine shows.
    struct PatternLog {
        shown: Vec<StatusPattern>,
    }

    impl PatternLog {
        fn new() -> Self {
            Self { shown: Vec::new() }
        }
    }

    impl Indicator for PatternLog {
        fn show(&mut self, pattern: StatusPattern) {
            self.shown.push(pattern);
        }
    }

    /// Accumulates requested delay time.
    struct SleepLog {
        total_ns: u64,
    }

    impl SleepLog {
        fn new() -> Self {
            Self { total_ns: 0 }
        }
    }

    impl DelayNs for SleepLog {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    /// Delay that re-raises the trigger latch while sleeping, simulating
    /// contact bounce inside the debounce window.
    struct BouncyDelay<'a> {
        events: &'a EventLatches,
    }

    impl DelayNs for BouncyDelay<'_> {
        fn delay_ns(&mut self, _ns: u32) {
            self.events.signal_trigger();
        }
    }

    const DEBOUNCE_NS: u64 = DEBOUNCE_DELAY_MS as u64 * 1_000_000;

    #[test]
    fn idle_without_trigger_stays_idle() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut delay = SleepLog::new();
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                PipeLink::new(),
                PatternLog::new(),
                &mut delay,
            );
            controller.tick();
            assert_eq!(controller.state(), State::Idle);
        }
        assert_eq!(delay.total_ns, 0);
    }

    #[test]
    fn pending_trigger_debounces_then_starts_sampling() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut delay = SleepLog::new();
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                PipeLink::new(),
                PatternLog::new(),
                &mut delay,
            );
            events.signal_trigger();
            controller.tick();
            assert_eq!(controller.state(), State::Sampling);
        }
        assert_eq!(delay.total_ns, DEBOUNCE_NS);
        assert!(!events.take_trigger(), "trigger latch must be consumed");
    }

    #[test]
    fn bounce_during_debounce_window_is_swallowed() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                PipeLink::new(),
                PatternLog::new(),
                BouncyDelay { events: &events },
            );
            events.signal_trigger();
            controller.tick();
            assert_eq!(controller.state(), State::Sampling);
        }
        assert!(
            !events.take_trigger(),
            "bounced edges belong to the same press"
        );
    }

    #[test]
    fn repeated_presses_before_a_poll_coalesce_into_one_episode() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        events.signal_trigger();
        events.signal_trigger();
        events.signal_trigger();

        controller.tick();
        assert_eq!(controller.state(), State::Sampling);
        // No start command: back to idle, where the coalesced latch must
        // not restart sampling.
        controller.tick();
        assert_eq!(controller.state(), State::Idle);
        controller.tick();
        assert_eq!(controller.state(), State::Idle);
    }

    #[test]
    fn sampling_fills_the_buffer_in_conversion_order() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                PipeLink::new(),
                PatternLog::new(),
                SleepLog::new(),
            );
            events.signal_trigger();
            controller.tick();
            controller.tick();
            assert_eq!(controller.buffer().as_slice().len(), SAMPLES_PER_BATCH);
        }
        for (index, &sample) in buffer.as_slice().iter().enumerate() {
            assert_eq!(sample, index as u16);
        }
    }

    #[test]
    fn sampling_without_start_command_times_out_to_idle() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        events.signal_trigger();
        controller.tick();
        assert_eq!(controller.state(), State::Sampling);

        controller.tick();
        assert_eq!(controller.state(), State::Idle);
        assert_eq!(controller.batches_sent(), 0);
    }

    #[test]
    fn sampling_with_start_command_moves_to_transfer() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        events.signal_trigger();
        controller.tick();
        events.record_byte(b's');

        controller.tick();
        assert_eq!(controller.state(), State::Transfer);
        assert_eq!(controller.batches_sent(), 0);
        assert!(
            !events.take_command(HostCommand::StartTransfer),
            "start command must be consumed"
        );
    }

    #[test]
    fn transfer_emits_the_batch_as_little_endian_pairs() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut link = PipeLink::new();
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                &mut link,
                PatternLog::new(),
                SleepLog::new(),
            );
            events.signal_trigger();
            controller.tick();
            events.record_byte(b's');
            controller.tick();
            controller.tick();
            assert_eq!(controller.batches_sent(), 1);
        }
        assert_eq!(link.sent.len(), 2 * SAMPLES_PER_BATCH);
        for (index, pair) in link.sent.chunks_exact(2).enumerate() {
            assert_eq!(u16::from_le_bytes([pair[0], pair[1]]) as usize, index);
        }
    }

    #[test]
    fn transfer_without_proceed_aborts_to_idle() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        events.signal_trigger();
        controller.tick();
        events.record_byte(b's');
        controller.tick();

        controller.tick();
        assert_eq!(controller.state(), State::Idle);
        assert_eq!(controller.batches_sent(), 1);
    }

    #[test]
    fn proceed_below_the_bound_requests_another_batch() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        events.signal_trigger();
        controller.tick();
        events.record_byte(b's');
        controller.tick();

        // Transfers 1 through 4, host asking to continue each time.
        for expected in 1..=4 {
            events.record_byte(b'o');
            controller.tick();
            assert_eq!(controller.batches_sent(), expected);
            assert_eq!(controller.state(), State::Sampling);
            events.record_byte(b's');
            controller.tick();
            assert_eq!(controller.state(), State::Transfer);
        }
    }

    #[test]
    fn batch_bound_forces_idle_even_when_host_asks_to_continue() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        events.signal_trigger();
        controller.tick();
        events.record_byte(b's');
        controller.tick();

        for batch in 1..=MAX_BATCHES {
            events.record_byte(b'o');
            controller.tick();
            assert_eq!(controller.batches_sent(), batch);
            if batch < MAX_BATCHES {
                assert_eq!(controller.state(), State::Sampling);
                events.record_byte(b's');
                controller.tick();
            }
        }
        assert_eq!(controller.state(), State::Idle);
        assert_eq!(controller.batches_sent(), MAX_BATCHES);
        assert!(
            !events.take_command(HostCommand::Proceed),
            "final proceed must still be consumed"
        );
    }

    #[test]
    fn idle_resets_the_counter() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        // Abort an episode so the counter is nonzero entering idle.
        events.signal_trigger();
        controller.tick();
        events.record_byte(b's');
        controller.tick();
        controller.tick();
        assert_eq!(controller.batches_sent(), 1);

        controller.tick();
        assert_eq!(controller.state(), State::Idle);
        assert_eq!(controller.batches_sent(), 0);
    }

    #[test]
    fn idle_flushes_stale_host_bytes() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut link = PipeLink::new();
        link.rx.extend([b's', b'o', b'?']);
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                &mut link,
                PatternLog::new(),
                SleepLog::new(),
            );
            controller.tick();
            assert_eq!(controller.state(), State::Idle);
        }
        assert!(link.rx.is_empty(), "idle must drain unread host bytes");
    }

    #[test]
    fn indicator_tracks_the_state_sequence() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut patterns = PatternLog::new();
        {
            let mut controller = Controller::new(
                &events,
                &mut buffer,
                RampSource::new(),
                PipeLink::new(),
                &mut patterns,
                SleepLog::new(),
            );
            controller.tick();
            events.signal_trigger();
            controller.tick();
            events.record_byte(b's');
            controller.tick();
            controller.tick();
            controller.tick();
        }
        assert_eq!(
            patterns.shown,
            [
                StatusPattern::Idle,
                StatusPattern::Idle,
                StatusPattern::Sampling,
                StatusPattern::Transfer,
                StatusPattern::Idle,
            ]
        );
    }

    #[test]
    fn commands_are_only_consumed_by_their_state() {
        let events = EventLatches::new();
        let mut buffer = SampleBuffer::new();
        let mut controller = Controller::new(
            &events,
            &mut buffer,
            RampSource::new(),
            PipeLink::new(),
            PatternLog::new(),
            SleepLog::new(),
        );
        // A proceed latched while sampling must survive into transfer.
        events.signal_trigger();
        controller.tick();
        events.record_byte(b's');
        events.record_byte(b'o');
        controller.tick();
        assert_eq!(controller.state(), State::Transfer);

        controller.tick();
        assert_eq!(controller.state(), State::Sampling);
    }
}
