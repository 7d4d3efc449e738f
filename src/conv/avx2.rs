//! AVX2 dual-window and batch-accumulate kernels.

use core::arch::x86_64::*;

use super::{
    BLOCK, LANES, accumulate_blocks, check_buffers, lane_mask,
    sse4_1::{dot_sse4_1, load_window},
};
use crate::signal::Filter;

/// AVX2 implementation of the dual-window strategy.
///
/// The windows at `t` and `t + 1` are stacked into the low and high 128-bit halves of one
/// register. `hadd` works within halves, so both dot products are reduced in parallel and
/// end up in lanes 0 and 4.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn convolve_dot_pair_avx2<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    unsafe {
        let coeffs = filter.reversed_lanes::<LANES>();
        let mask = lane_mask::<K>();
        let coeffs_half = _mm_loadu_si128(coeffs.as_ptr().cast());
        let mask_half = _mm_loadu_si128(mask.as_ptr().cast());
        let coeffs = _mm256_set_m128i(coeffs_half, coeffs_half);
        let mask = _mm256_set_m128i(mask_half, mask_half);

        let output = &mut output[..len];
        let mut pairs = output.chunks_exact_mut(2);
        for (pair_idx, pair) in pairs.by_ref().enumerate() {
            let t = pair_idx * 2;
            let windows = _mm256_set_m128i(load_window(input, t + 1), load_window(input, t));
            let windows = _mm256_and_si256(windows, mask);

            let products = _mm256_madd_epi16(coeffs, windows);
            let sum = _mm256_hadd_epi32(products, products);
            let sum = _mm256_hadd_epi32(sum, sum);

            pair[0] = _mm256_extract_epi32::<0>(sum) as i16;
            pair[1] = _mm256_extract_epi32::<4>(sum) as i16;
        }

        // Odd length: the last output goes through a single 128-bit window.
        if let [last] = pairs.into_remainder() {
            let window = load_window(input, len - 1);
            *last = dot_sse4_1(coeffs_half, mask_half, window) as i16;
        }
        output
    }
}

/// AVX2 implementation of the batch-accumulate strategy.
///
/// Each block of 16 outputs is built from `K` passes. Pass `i` widens 16 contiguous input
/// samples to i32, multiplies them by the broadcast coefficient `filter[i]` and adds them to
/// the accumulators. Every lane then holds a finished output, no horizontal reduction is
/// needed. The remainder is handled by the portable block routine.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn convolve_accumulate_avx2<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    unsafe {
        let low_half = _mm256_set1_epi32(0xFFFF);

        let output = &mut output[..len];
        let full_blocks = len / BLOCK;

        for block_idx in 0..full_blocks {
            let t = block_idx * BLOCK;
            let mut acc_low = _mm256_setzero_si256();
            let mut acc_high = _mm256_setzero_si256();

            for (i, &tap) in filter.taps().iter().enumerate() {
                // Highest read is t + K - 1 + 15 <= len + K - 2, inside the padded input.
                let source = input.as_ptr().add(t + K - 1 - i);
                let coeff = _mm256_set1_epi32(i32::from(tap));

                let x_low = _mm256_cvtepi16_epi32(_mm_loadu_si128(source.cast()));
                let x_high = _mm256_cvtepi16_epi32(_mm_loadu_si128(source.add(LANES).cast()));

                acc_low = _mm256_add_epi32(acc_low, _mm256_mullo_epi32(x_low, coeff));
                acc_high = _mm256_add_epi32(acc_high, _mm256_mullo_epi32(x_high, coeff));
            }

            // Keep the low 16 bits of every lane so the unsigned pack truncates instead of
            // saturating, then restore lane order across the 128-bit halves.
            let packed = _mm256_packus_epi32(
                _mm256_and_si256(acc_low, low_half),
                _mm256_and_si256(acc_high, low_half),
            );
            let ordered = _mm256_permute4x64_epi64::<0b11_01_10_00>(packed);
            _mm256_storeu_si256(output.as_mut_ptr().add(t).cast(), ordered);
        }

        let tail_start = full_blocks * BLOCK;
        accumulate_blocks(filter, input, &mut output[tail_start..], tail_start);
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

    fn dot_pair<'a, const K: usize>(
        filter: &Filter<K>,
        input: &[i16],
        output: &'a mut [i16],
        len: usize,
    ) -> &'a [i16] {
        unsafe { convolve_dot_pair_avx2(filter, input, output, len) }
    }

    fn accumulate<'a, const K: usize>(
        filter: &Filter<K>,
        input: &[i16],
        output: &'a mut [i16],
        len: usize,
    ) -> &'a [i16] {
        unsafe { convolve_accumulate_avx2(filter, input, output, len) }
    }

    #[test]
    fn test_avx2_kernels_reference_dataset() {
        if !std::arch::is_x86_feature_detected!("avx2") {
            return;
        }
        let store = SignalStore::reference();
        assert_eq!(run(dot_pair, &store), data::EXPECTED);
        assert_eq!(run(accumulate, &store), data::EXPECTED);
    }

    #[test]
    fn test_avx2_kernels_match_naive() {
        if !std::arch::is_x86_feature_detected!("avx2") {
            return;
        }
        for len in [0, 1, 2, 13, 14, 15, 16, 30, 31, 32, 48, 1023] {
            let filter = Filter::new([-1, 2, 10, 2, -1]);
            let store = SignalStore::new(filter, &random_samples(len));
            let expected = run(convolve_naive, &store);
            assert_eq!(run(dot_pair, &store), expected, "dot-pair, len {len}");
            assert_eq!(run(accumulate, &store), expected, "accumulate, len {len}");
        }
    }

    #[test]
    fn test_accumulate_avx2_truncates_instead_of_saturating() {
        if !std::arch::is_x86_feature_detected!("avx2") {
            return;
        }
        let filter = Filter::new([i16::MAX, i16::MAX, i16::MIN]);
        let samples = [i16::MAX; 40];
        let store = SignalStore::new(filter, &samples);
        assert_eq!(run(accumulate, &store), run(convolve_naive, &store));
    }
}
