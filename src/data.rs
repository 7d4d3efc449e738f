//! Compiled-in reference dataset.
//!
//! A symmetric five-tap filter applied to the ramp `-9..=9`. The expected output was
//! computed independently and is only ever used for validation.

/// Number of filter taps.
pub const FILTER_LEN: usize = 5;

/// Number of real (unpadded) input samples.
pub const INPUT_LEN: usize = 19;

/// Number of zero guard samples on each side of the input.
pub const PADDING: usize = FILTER_LEN - 1;

/// Length of the full convolution.
pub const OUTPUT_LEN: usize = FILTER_LEN + INPUT_LEN - 1;

/// Filter coefficients.
pub const FILTER: [i16; FILTER_LEN] = [-1, 2, 10, 2, -1];

/// Input samples including the zero guards.
#[rustfmt::skip]
pub const INPUT: [i16; INPUT_LEN + 2 * PADDING] = [
    0, 0, 0, 0,
    -9, -8, -7, -6, -5, -4, -3, -2, -1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9,
    0, 0, 0, 0,
];

/// Expected convolution of [`FILTER`] and [`INPUT`].
pub const EXPECTED: [i16; OUTPUT_LEN] = [
    9, -10, -99, -106, -84, -72, -60, -48, -36, -24, -12, 0, 12, 24, 36, 48, 60, 72, 84, 106, 99,
    10, -9,
];
