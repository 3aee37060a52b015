//! Fixed-capacity acquisition storage.

// SPDX-License-Identifier: Apache-2.0

use crate::SAMPLES_PER_BATCH;

/// One batch of samples, in acquisition order.
///
/// The buffer is fully overwritten by every acquisition pass, so no stale
/// data carries over between batches. It has exactly one writer (the
/// sampler, during the sampling state) and one reader (the transmitter,
/// during the transfer state); the state machine's sequencing guarantees
/// those never overlap, so no locking is needed here.
pub struct SampleBuffer {
    /// Backing storage, [`SAMPLES_PER_BATCH`] entries.
    samples: [u16; SAMPLES_PER_BATCH],
}

impl SampleBuffer {
    /// Zero-filled buffer. `const` so the firmware can place it in a
    /// `singleton!` rather than on the loop's stack.
    pub const fn new() -> Self {
        Self {
            samples: [0; SAMPLES_PER_BATCH],
        }
    }

    /// Samples in acquisition order.
    pub fn as_slice(&self) -> &[u16] {
        &self.samples
    }

    /// Mutable view for the sampler. Kept crate-private so a partially
    /// written batch is never visible outside the acquisition pass.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.samples
    }

    /// Number of samples per batch.
    pub const fn len(&self) -> usize {
        SAMPLES_PER_BATCH
    }

    /// A batch is never empty.
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
