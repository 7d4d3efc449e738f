//! NEON kernels for aarch64.

use core::arch::aarch64::*;

use super::{BLOCK, LANES, accumulate_blocks, check_buffers, lane_mask, window_lanes};
use crate::signal::Filter;

/// Loads the eight-lane window starting at `start`, zero-filling past the end of `input`.
#[inline]
#[target_feature(enable = "neon")]
unsafe fn load_window(input: &[i16], start: usize) -> int16x8_t {
    unsafe {
        if start + LANES <= input.len() {
            vld1q_s16(input.as_ptr().add(start))
        } else {
            let lanes = window_lanes(input, start);
            vld1q_s16(lanes.as_ptr())
        }
    }
}

/// Pairwise multiply-add of one masked window: four i32 lanes of adjacent product sums.
#[inline]
#[target_feature(enable = "neon")]
unsafe fn madd(coeffs: int16x8_t, mask: int16x8_t, window: int16x8_t) -> int32x4_t {
    unsafe {
        let window = vandq_s16(window, mask);
        let low = vmull_s16(vget_low_s16(coeffs), vget_low_s16(window));
        let high = vmull_high_s16(coeffs, window);
        vpaddq_s32(low, high)
    }
}

/// NEON implementation of the narrow dot-product strategy.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn convolve_dot_neon<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    unsafe {
        let coeffs = filter.reversed_lanes::<LANES>();
        let mask = lane_mask::<K>();
        let coeffs = vld1q_s16(coeffs.as_ptr());
        let mask = vld1q_s16(mask.as_ptr());

        let output = &mut output[..len];
        for (t, y) in output.iter_mut().enumerate() {
            let pairs = madd(coeffs, mask, load_window(input, t));
            // Adjacent pairs first, then the remaining two lanes.
            let sum = vpaddq_s32(pairs, pairs);
            let sum = vpaddq_s32(sum, sum);
            *y = vgetq_lane_s32::<0>(sum) as i16;
        }
        output
    }
}

/// NEON implementation of the dual-window strategy.
///
/// NEON registers are 128 bits wide, so the two windows live in separate registers and share
/// the reduction: after the first pairwise add the low half belongs to window `t` and the
/// high half to window `t + 1`.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn convolve_dot_pair_neon<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    unsafe {
        let coeffs = filter.reversed_lanes::<LANES>();
        let mask = lane_mask::<K>();
        let coeffs = vld1q_s16(coeffs.as_ptr());
        let mask = vld1q_s16(mask.as_ptr());

        let output = &mut output[..len];
        let mut pairs = output.chunks_exact_mut(2);
        for (pair_idx, pair) in pairs.by_ref().enumerate() {
            let t = pair_idx * 2;
            let low = madd(coeffs, mask, load_window(input, t));
            let high = madd(coeffs, mask, load_window(input, t + 1));

            // [l01 + l23, l45 + l67, h01 + h23, h45 + h67]
            let sum = vpaddq_s32(low, high);
            // [low, high, low, high]
            let sum = vpaddq_s32(sum, sum);

            pair[0] = vgetq_lane_s32::<0>(sum) as i16;
            pair[1] = vgetq_lane_s32::<1>(sum) as i16;
        }

        if let [last] = pairs.into_remainder() {
            let pairs = madd(coeffs, mask, load_window(input, len - 1));
            let sum = vpaddq_s32(pairs, pairs);
            let sum = vpaddq_s32(sum, sum);
            *last = vgetq_lane_s32::<0>(sum) as i16;
        }
        output
    }
}

/// NEON implementation of the batch-accumulate strategy. 16 outputs per block in four
/// i32 accumulators, narrowed with the truncating `vmovn`.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn convolve_accumulate_neon<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    unsafe {
        let output = &mut output[..len];
        let full_blocks = len / BLOCK;

        for block_idx in 0..full_blocks {
            let t = block_idx * BLOCK;
            let mut acc = [vdupq_n_s32(0); 4];

            for (i, &tap) in filter.taps().iter().enumerate() {
                let source = input.as_ptr().add(t + K - 1 - i);
                let coeff = i32::from(tap);

                let x_low = vld1q_s16(source);
                let x_high = vld1q_s16(source.add(LANES));

                acc[0] = vmlaq_n_s32(acc[0], vmovl_s16(vget_low_s16(x_low)), coeff);
                acc[1] = vmlaq_n_s32(acc[1], vmovl_high_s16(x_low), coeff);
                acc[2] = vmlaq_n_s32(acc[2], vmovl_s16(vget_low_s16(x_high)), coeff);
                acc[3] = vmlaq_n_s32(acc[3], vmovl_high_s16(x_high), coeff);
            }

            let low = vmovn_high_s32(vmovn_s32(acc[0]), acc[1]);
            let high = vmovn_high_s32(vmovn_s32(acc[2]), acc[3]);
            vst1q_s16(output.as_mut_ptr().add(t), low);
            vst1q_s16(output.as_mut_ptr().add(t + LANES), high);
        }

        let tail_start = full_blocks * BLOCK;
        accumulate_blocks(filter, input, &mut output[tail_start..], tail_start);
        output
    }
}
