//! Bit-exact FIR convolution of 16-bit signals with scalar and SIMD kernels.
//!
//! All kernels compute the full convolution of a short, compile-time sized [`Filter`] with a
//! zero-padded [`PaddedSignal`]. They only differ in how the work is spread across vector
//! lanes and are interchangeable through the [`Kernel`] enum:
//!
//! - [`Kernel::Naive`]: scalar nested loop, the ground truth.
//! - [`Kernel::Dot`]: one 128-bit register per output with a horizontal reduction.
//! - [`Kernel::DotPair`]: two windows per 256-bit register, two outputs per iteration.
//! - [`Kernel::Accumulate`]: 16 outputs per block, tap-by-tap accumulation without
//!   horizontal reductions.
//!
//! The vector kernels use SSE4.1/AVX2 on x86_64 (selected by runtime CPU detection), NEON on
//! aarch64 and a portable lane emulation everywhere else.
//!
//! ```rust
//! use simdconv::{Kernel, SignalStore, validate};
//!
//! let store = SignalStore::reference();
//! let mut output = vec![0i16; store.output_len()];
//!
//! for kernel in Kernel::ALL {
//!     let produced = kernel.convolve(&store, &mut output).unwrap();
//!     validate(produced, store.expected()).unwrap();
//! }
//! ```
#![cfg_attr(feature = "no_std", no_std)]

extern crate alloc;

#[cfg(not(feature = "no_std"))]
pub mod bench;
mod conv;
pub mod data;
mod error;
mod kernel;
mod signal;
mod validate;

pub use conv::{
    ConvolveFn, convolve_accumulate_portable, convolve_dot_pair_portable, convolve_dot_portable,
    convolve_naive,
};
pub use error::ConvolveError;
pub use kernel::{Backend, Kernel};
pub use signal::{Filter, PaddedSignal, SignalStore};
pub use validate::{Mismatch, mismatches, validate};
