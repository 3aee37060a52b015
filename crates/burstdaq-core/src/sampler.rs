//! Batch acquisition: drives the converter to fill the buffer.

// SPDX-License-Identifier: Apache-2.0

use crate::{buffer::SampleBuffer, peripheral::SampleSource};

/// Fill `buffer` with one batch of conversions, in order.
///
/// Each conversion is started and then awaited with a busy spin. The wait
/// is deliberately unbounded: the converter is assumed to always complete
/// a started conversion, matching the reference hardware. On a faulty
/// converter this spins forever; that limitation is preserved rather
/// than papered over with an unspecified timeout policy.
///
/// When this returns, every slot in `buffer` holds a fresh sample.
pub fn acquire_batch<S: SampleSource>(source: &mut S, buffer: &mut SampleBuffer) {
    for slot in buffer.as_mut_slice() {
        source.start_conversion();
        *slot = loop {
            if let Some(sample) = source.try_result() {
                break sample;
            }
        };
    }
}
