//! Signal store: filter coefficients, zero-padded input and the expected reference.

use alloc::{boxed::Box, vec};

use crate::{ConvolveError, conv::convolve_naive, data};

/// A fixed-length FIR filter with `K` taps.
///
/// `K` is a compile-time constant, so every kernel instantiated for a filter works on the same
/// number of taps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Filter<const K: usize> {
    taps: [i16; K],
}

impl<const K: usize> Filter<K> {
    /// Create a new [`Filter`] from its coefficients.
    pub const fn new(taps: [i16; K]) -> Self {
        const { assert!(K > 0, "a filter needs at least one tap") };
        Self { taps }
    }

    /// The coefficients in their natural order.
    pub const fn taps(&self) -> &[i16; K] {
        &self.taps
    }

    /// The coefficients in reverse order.
    pub fn reversed(&self) -> [i16; K] {
        let mut reversed = self.taps;
        reversed.reverse();
        reversed
    }

    /// Returns `true` if the filter reads the same in both directions.
    pub fn is_palindromic(&self) -> bool {
        self.taps.iter().eq(self.taps.iter().rev())
    }

    /// Reversed coefficients zero-extended to `L` lanes.
    ///
    /// Lane `j` multiplies input element `t + j` of the window starting at `t`.
    pub(crate) fn reversed_lanes<const L: usize>(&self) -> [i16; L] {
        const { assert!(K <= L, "filter does not fit into one register") };
        let mut lanes = [0i16; L];
        for (lane, &tap) in lanes.iter_mut().zip(self.taps.iter().rev()) {
            *lane = tap;
        }
        lanes
    }
}

/// An input signal flanked by zero guard samples on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaddedSignal {
    samples: Box<[i16]>,
    padding: usize,
}

impl PaddedSignal {
    /// Pads `samples` with `K - 1` zeros on each side.
    ///
    /// A filter length of zero is rejected at compile time:
    ///
    /// ```compile_fail
    /// let signal = simdconv::PaddedSignal::new::<0>(&[1, 2, 3]);
    /// ```
    pub fn new<const K: usize>(samples: &[i16]) -> Self {
        const { assert!(K > 0, "a filter needs at least one tap") };
        let padding = K - 1;
        let mut padded = vec![0i16; samples.len() + 2 * padding];
        padded[padding..padding + samples.len()].copy_from_slice(samples);

        Self {
            samples: padded.into_boxed_slice(),
            padding,
        }
    }

    /// Wraps an already padded signal.
    ///
    /// Fails if `padded` cannot hold both guards or if any guard sample is not zero.
    pub fn from_padded<const K: usize>(padded: &[i16]) -> Result<Self, ConvolveError> {
        const { assert!(K > 0, "a filter needs at least one tap") };
        let padding = K - 1;
        if padded.len() < 2 * padding {
            return Err(ConvolveError::InputBufferSize);
        }

        let (head, rest) = padded.split_at(padding);
        let tail = &rest[rest.len() - padding..];
        if head.iter().chain(tail).any(|&sample| sample != 0) {
            return Err(ConvolveError::NonZeroPadding);
        }

        Ok(Self {
            samples: padded.into(),
            padding,
        })
    }

    /// The whole padded buffer, as handed to the kernels.
    pub fn as_padded(&self) -> &[i16] {
        &self.samples
    }

    /// The real samples without guards.
    pub fn samples(&self) -> &[i16] {
        &self.samples[self.padding..self.samples.len() - self.padding]
    }

    /// Number of real samples.
    pub fn len(&self) -> usize {
        self.samples.len() - 2 * self.padding
    }

    /// Returns `true` if there are no real samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the full convolution with a filter matching the padding.
    pub fn output_len(&self) -> usize {
        self.len() + self.padding
    }
}

/// Filter, input and expected output of one convolution problem.
///
/// Everything in a store is immutable once it has been built.
#[derive(Debug, Clone)]
pub struct SignalStore<const K: usize> {
    filter: Filter<K>,
    input: PaddedSignal,
    expected: Box<[i16]>,
}

impl SignalStore<{ data::FILTER_LEN }> {
    /// The compiled-in reference dataset.
    pub fn reference() -> Self {
        Self {
            filter: Filter::new(data::FILTER),
            input: PaddedSignal {
                samples: Box::new(data::INPUT),
                padding: data::PADDING,
            },
            expected: Box::new(data::EXPECTED),
        }
    }
}

impl<const K: usize> SignalStore<K> {
    /// Builds a store from unpadded samples. The expected output is computed with the scalar
    /// reference kernel.
    pub fn new(filter: Filter<K>, samples: &[i16]) -> Self {
        let input = PaddedSignal::new::<K>(samples);
        let len = input.output_len();
        let mut expected = vec![0i16; len].into_boxed_slice();
        convolve_naive(&filter, input.as_padded(), &mut expected, len);

        Self {
            filter,
            input,
            expected,
        }
    }

    /// Builds a store from an externally computed expected output.
    pub fn with_expected(
        filter: Filter<K>,
        input: PaddedSignal,
        expected: &[i16],
    ) -> Result<Self, ConvolveError> {
        if input.padding != K - 1 {
            return Err(ConvolveError::InputBufferSize);
        }
        if expected.len() != input.output_len() {
            return Err(ConvolveError::LengthMismatch {
                got: expected.len(),
                expected: input.output_len(),
            });
        }

        Ok(Self {
            filter,
            input,
            expected: expected.into(),
        })
    }

    pub fn filter(&self) -> &Filter<K> {
        &self.filter
    }

    pub fn input(&self) -> &PaddedSignal {
        &self.input
    }

    pub fn expected(&self) -> &[i16] {
        &self.expected
    }

    /// Number of outputs every kernel produces for this store.
    pub fn output_len(&self) -> usize {
        self.input.output_len()
    }
}
