//! Convolution kernels.
//!
//! Every kernel computes the full convolution
//! `output[t] = sum(filter[i] * input[t + K - 1 - i])` over a zero-padded input and returns
//! the filled prefix of the output buffer. Products are exact in i32, sums wrap in i32 and
//! the result is truncated to i16. Since all of these are ring operations modulo 2^16 after
//! truncation, every kernel in this module and in the SIMD submodules agrees bit for bit,
//! including on inputs that overflow i16.
//!
//! The portable functions here emulate the register layout and reduction order of the SIMD
//! kernels with plain lane arrays. They run on targets without the instruction sets and are
//! used as the reference shape for the intrinsics.

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;
#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;
#[cfg(target_arch = "x86_64")]
pub(crate) mod sse4_1;

use crate::signal::Filter;

/// Number of i16 lanes in a 128-bit register.
pub(crate) const LANES: usize = 8;

/// Number of outputs the accumulate strategy produces per block.
pub(crate) const BLOCK: usize = 16;

/// Uniform calling convention of all kernels.
///
/// Arguments are the filter, the padded input (at least `len + K - 1` samples), the output
/// buffer (at least `len` samples) and the number of outputs to produce.
pub type ConvolveFn<const K: usize> =
    for<'a> fn(filter: &Filter<K>, input: &[i16], output: &'a mut [i16], len: usize) -> &'a [i16];

/// Panics if the buffers cannot hold a convolution of `len` outputs.
#[inline(always)]
pub(crate) fn check_buffers<const K: usize>(input: &[i16], output: &[i16], len: usize) {
    assert!(
        input.len() + 1 >= len + K,
        "input holds {} samples, {len} outputs need {}",
        input.len(),
        len + K - 1
    );
    assert!(
        output.len() >= len,
        "output holds {} samples, {len} outputs requested",
        output.len()
    );
}

/// Scalar reference implementation with a nested loop.
pub fn convolve_naive<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    let output = &mut output[..len];
    for (t, y) in output.iter_mut().enumerate() {
        let mut acc = 0i32;
        for (i, &tap) in filter.taps().iter().enumerate() {
            acc = acc.wrapping_add(i32::from(tap) * i32::from(input[t + K - 1 - i]));
        }
        *y = acc as i16;
    }
    output
}

/// Lane mask with all bits set for the first `K` lanes.
#[inline(always)]
pub(crate) fn lane_mask<const K: usize>() -> [i16; LANES] {
    let mut mask = [0i16; LANES];
    for lane in mask.iter_mut().take(K) {
        *lane = -1;
    }
    mask
}

/// Copies up to [`LANES`] samples starting at `start` into a zero-filled lane array.
#[inline(always)]
pub(crate) fn window_lanes(input: &[i16], start: usize) -> [i16; LANES] {
    let mut lanes = [0i16; LANES];
    if let Some(rest) = input.get(start..) {
        let available = rest.len().min(LANES);
        lanes[..available].copy_from_slice(&rest[..available]);
    }
    lanes
}

/// Multiplies lanes pairwise and sums adjacent products into four i32 lanes, then reduces
/// them with two rounds of adjacent-pair additions.
#[inline(always)]
fn dot_lanes(coeffs: &[i16; LANES], mask: &[i16; LANES], window: &[i16; LANES]) -> i32 {
    let mut pairs = [0i32; LANES / 2];
    for (j, pair) in pairs.iter_mut().enumerate() {
        let even = i32::from(coeffs[2 * j]) * i32::from(window[2 * j] & mask[2 * j]);
        let odd = i32::from(coeffs[2 * j + 1]) * i32::from(window[2 * j + 1] & mask[2 * j + 1]);
        *pair = even.wrapping_add(odd);
    }

    let [p0, p1, p2, p3] = pairs;
    p0.wrapping_add(p1).wrapping_add(p2.wrapping_add(p3))
}

/// Portable narrow dot-product kernel: one window of eight lanes per output.
pub fn convolve_dot_portable<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    let coeffs = filter.reversed_lanes::<LANES>();
    let mask = lane_mask::<K>();

    let output = &mut output[..len];
    for (t, y) in output.iter_mut().enumerate() {
        let window = window_lanes(input, t);
        *y = dot_lanes(&coeffs, &mask, &window) as i16;
    }
    output
}

/// Portable dual-window kernel: two outputs per iteration, reduced independently.
pub fn convolve_dot_pair_portable<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    let coeffs = filter.reversed_lanes::<LANES>();
    let mask = lane_mask::<K>();

    let output = &mut output[..len];
    let mut pairs = output.chunks_exact_mut(2);
    for (pair_idx, pair) in pairs.by_ref().enumerate() {
        let t = pair_idx * 2;
        let low = window_lanes(input, t);
        let high = window_lanes(input, t + 1);
        pair[0] = dot_lanes(&coeffs, &mask, &low) as i16;
        pair[1] = dot_lanes(&coeffs, &mask, &high) as i16;
    }

    if let [last] = pairs.into_remainder() {
        let window = window_lanes(input, len - 1);
        *last = dot_lanes(&coeffs, &mask, &window) as i16;
    }
    output
}

/// Accumulates blocks of up to [`BLOCK`] outputs tap by tap.
///
/// `output[j]` receives the convolution at offset `start + j`.
#[inline(always)]
pub(crate) fn accumulate_blocks<const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &mut [i16],
    start: usize,
) {
    for (block_idx, block) in output.chunks_mut(BLOCK).enumerate() {
        let t = start + block_idx * BLOCK;
        let mut acc = [0i32; BLOCK];

        for (i, &tap) in filter.taps().iter().enumerate() {
            let coeff = i32::from(tap);
            let base = t + K - 1 - i;
            let source = &input[base..base + block.len()];
            for (lane, &x) in acc.iter_mut().zip(source) {
                *lane = lane.wrapping_add(coeff * i32::from(x));
            }
        }

        for (y, &lane) in block.iter_mut().zip(acc.iter()) {
            *y = lane as i16;
        }
    }
}

/// Portable batch-accumulate kernel without horizontal reductions.
pub fn convolve_accumulate_portable<'a, const K: usize>(
    filter: &Filter<K>,
    input: &[i16],
    output: &'a mut [i16],
    len: usize,
) -> &'a [i16] {
    check_buffers::<K>(input, output, len);

    let output = &mut output[..len];
    accumulate_blocks(filter, input, output, 0);
    output
}

#[cfg(test)]
pub(crate) mod tests {
    use alloc::{vec, vec::Vec};

    use rand_aes::tls::rand_f32;

    use super::*;
    use crate::{SignalStore, data};

    /// Random samples spread over the whole i16 range.
    pub(crate) fn random_samples(len: usize) -> Vec<i16> {
        (0..len)
            .map(|_| ((rand_f32() * 2.0 - 1.0) * i16::MAX as f32) as i16)
            .collect()
    }

    /// Runs `kernel` on a store and returns the produced output.
    pub(crate) fn run<const K: usize>(kernel: ConvolveFn<K>, store: &SignalStore<K>) -> Vec<i16> {
        let len = store.output_len();
        let mut output = vec![0x5555i16; len];
        kernel(store.filter(), store.input().as_padded(), &mut output, len).to_vec()
    }

    pub(crate) fn portable_kernels<const K: usize>() -> [(&'static str, ConvolveFn<K>); 3] {
        [
            ("dot", convolve_dot_portable::<K>),
            ("dot-pair", convolve_dot_pair_portable::<K>),
            ("accumulate", convolve_accumulate_portable::<K>),
        ]
    }

    #[test]
    fn test_naive_reference_dataset() {
        let store = SignalStore::reference();
        assert_eq!(run(convolve_naive, &store), data::EXPECTED);
    }

    #[test]
    fn test_portable_kernels_reference_dataset() {
        let store = SignalStore::reference();
        for (name, kernel) in portable_kernels() {
            assert_eq!(run(kernel, &store), data::EXPECTED, "kernel {name}");
        }
    }

    #[test]
    fn test_portable_kernels_match_naive_on_random_input() {
        for len in [0, 1, 2, 7, 8, 15, 16, 17, 31, 33, 100, 1000] {
            let samples = random_samples(len);
            let store = SignalStore::new(Filter::new([-3, 7, 11, 7, -3]), &samples);
            let expected = run(convolve_naive, &store);
            for (name, kernel) in portable_kernels() {
                assert_eq!(run(kernel, &store), expected, "kernel {name}, len {len}");
            }
        }
    }

    #[test]
    fn test_portable_kernels_wrap_like_naive() {
        let samples = vec![i16::MIN, i16::MAX, i16::MIN, i16::MIN, i16::MAX, -1, i16::MIN];
        let filter = Filter::new([
            i16::MIN,
            i16::MIN,
            i16::MAX,
            i16::MIN,
            i16::MIN,
            i16::MAX,
            i16::MIN,
            i16::MIN,
        ]);
        let store = SignalStore::new(filter, &samples);
        let expected = run(convolve_naive, &store);
        for (name, kernel) in portable_kernels() {
            assert_eq!(run(kernel, &store), expected, "kernel {name}");
        }
    }

    #[test]
    fn test_impulse_reproduces_filter() {
        let filter = Filter::new([4, -2, 9]);
        for position in 0..6 {
            let mut samples = vec![0i16; 6];
            samples[position] = 1;
            let store = SignalStore::new(filter, &samples);

            let mut expected = vec![0i16; store.output_len()];
            expected[position..position + 3].copy_from_slice(filter.taps());

            assert_eq!(run(convolve_naive, &store), expected);
            for (name, kernel) in portable_kernels() {
                assert_eq!(run(kernel, &store), expected, "kernel {name}, position {position}");
            }
        }
    }

    #[test]
    fn test_accumulate_handles_long_filters() {
        let filter = Filter::new([3, -1, 4, 1, -5, 9, 2, -6, 5, 3, -5, 8]);
        for len in [0, 5, 16, 17, 40] {
            let store = SignalStore::new(filter, &random_samples(len));
            assert_eq!(
                run(convolve_accumulate_portable, &store),
                store.expected(),
                "len {len}"
            );
        }
    }

    #[test]
    fn test_all_zero_input() {
        let store = SignalStore::new(Filter::new([5, -1, 3, 2]), &[0; 37]);
        assert_eq!(run(convolve_naive, &store), vec![0; 40]);
        for (name, kernel) in portable_kernels() {
            assert_eq!(run(kernel, &store), vec![0; 40], "kernel {name}");
        }
    }

    #[test]
    fn test_boundary_partial_sums() {
        let filter = Filter::new(data::FILTER);
        let samples = [3, -5, 8, 1, 2, -7];
        let store = SignalStore::new(filter, &samples);
        let output = run(convolve_accumulate_portable, &store);

        // Left edge only overlaps the first `t + 1` samples.
        for t in 0..data::FILTER_LEN - 1 {
            let partial: i32 = (0..=t)
                .map(|i| i32::from(data::FILTER[i]) * i32::from(samples[t - i]))
                .sum();
            assert_eq!(i32::from(output[t]), partial, "left edge {t}");
        }

        // Right edge only overlaps the last samples.
        let n = samples.len();
        for t in n..n + data::FILTER_LEN - 1 {
            let partial: i32 = (t + 1 - n..data::FILTER_LEN)
                .map(|i| i32::from(data::FILTER[i]) * i32::from(samples[t - i]))
                .sum();
            assert_eq!(i32::from(output[t]), partial, "right edge {t}");
        }
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let store = SignalStore::new(Filter::new([1, -2, 1]), &random_samples(50));
        let len = store.output_len();
        let mut output = vec![0i16; len];
        for (_, kernel) in portable_kernels() {
            let first = kernel(store.filter(), store.input().as_padded(), &mut output, len).to_vec();
            let second = kernel(store.filter(), store.input().as_padded(), &mut output, len).to_vec();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_only_prefix_is_written() {
        let store = SignalStore::reference();
        let len = store.output_len();
        let mut output = vec![77i16; len + 3];
        let produced = convolve_dot_pair_portable(
            store.filter(),
            store.input().as_padded(),
            &mut output,
            len,
        );
        assert_eq!(produced.len(), len);
        assert_eq!(&output[len..], &[77, 77, 77]);
    }

    #[test]
    #[should_panic]
    fn test_short_output_panics() {
        let store = SignalStore::reference();
        let mut output = vec![0i16; store.output_len() - 1];
        convolve_naive(
            store.filter(),
            store.input().as_padded(),
            &mut output,
            store.output_len(),
        );
    }
}
