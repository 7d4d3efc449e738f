//! SSE4.1 narrow dot-product kernel.

use core::arch::x86_64::*;

use super::{LANES, check_buffers, lane_mask, window_lanes};
use crate::signal::Filter;

/// Loads the eight-lane window starting at `start`.
///
/// Windows that would read past the end of `input` are copied into a zero-filled buffer
/// first.
#[inline]
#[target_feature(enable = "sse2")]
pub(super) unsafe fn load_window(input: &[i16], start: usize) -> __m128i {
    unsafe {
        if start + LANES <= input.len() {
            _mm_loadu_si128(input.as_ptr().add(start).cast())
        } else {
            let lanes = window_lanes(input, start);
            _mm_loadu_si128(lanes.as_ptr().cast())
        }
    }
}

/// Dot product of one masked window with the reversed filter.
#[inline]
#[target_feature(enable = "sse4.1")]
pub(super) unsafe fn dot_sse4_1(coeffs: __m128i, mask: __m128i, window: __m128i) -> i32 {
    unsafe {
        let window = _mm_and_si128(window, mask);

        // [c0*x0 + c1*x1, c2*x2 + c3*x3, c4*x4 + c5*x5, c6*x6 + c7*x7]
        let pairs = _mm_madd_epi16(coeffs, window);

        // Two rounds of adjacent-pair sums leave the total in every lane.
        let sum = _mm_hadd_epi32(pairs, pairs);
        let sum = _mm_hadd_epi32(sum, sum);
        _mm_extract_epi32::<0>(sum)
    }
}

/// SSE4.1 implementation of the narrow dot-product strategy. One register per output.
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn convolve_dot_sse4_1<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    unsafe {
        let coeffs = filter.reversed_lanes::<LANES>();
        let mask = lane_mask::<K>();
        let coeffs = _mm_loadu_si128(coeffs.as_ptr().cast());
        let mask = _mm_loadu_si128(mask.as_ptr().cast());

        let output = &mut output[..len];
        for (t, y) in output.iter_mut().enumerate() {
            let window = load_window(input, t);
            *y = dot_sse4_1(coeffs, mask, window) as i16;
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        SignalStore,
        conv::{
            convolve_naive,
            tests::{random_samples, run},
        },
        data,
    };

    fn dot<'a, const K: usize>(
        filter: &Filter<K>,
        input: &[i16],
        output: &'a mut [i16],
        len: usize,
    ) -> &'a [i16] {
        unsafe { convolve_dot_sse4_1(filter, input, output, len) }
    }

    #[test]
    fn test_dot_sse4_1_reference_dataset() {
        if !std::arch::is_x86_feature_detected!("sse4.1") {
            return;
        }
        assert_eq!(run(dot, &SignalStore::reference()), data::EXPECTED);
    }

    #[test]
    fn test_dot_sse4_1_matches_naive() {
        if !std::arch::is_x86_feature_detected!("sse4.1") {
            return;
        }
        for len in [0, 1, 3, 8, 9, 64, 257] {
            let filter = Filter::new([9, -4, 0, 17, 2, -8, 1]);
            let store = SignalStore::new(filter, &random_samples(len));
            assert_eq!(run(dot, &store), run(convolve_naive, &store), "len {len}");
        }
    }

    #[test]
    fn test_load_window_zero_fills_tail() {
        if !std::arch::is_x86_feature_detected!("sse4.1") {
            return;
        }
        let input = [1i16, 2, 3, 4, 5];
        let mut lanes = [0i16; LANES];
        unsafe {
            let window = load_window(&input, 2);
            _mm_storeu_si128(lanes.as_mut_ptr().cast(), window);
        }
        assert_eq!(lanes, [3, 4, 5, 0, 0, 0, 0, 0]);
    }
}
