//! Kernel selection and runtime CPU dispatch.

use crate::{
    ConvolveError, SignalStore,
    conv::{
        ConvolveFn, convolve_accumulate_portable, convolve_dot_pair_portable,
        convolve_dot_portable, convolve_naive,
    },
};

/// The closed set of convolution strategies.
///
/// Every variant computes exactly the same output; they only differ in how the work is laid
/// out across vector lanes. Resolving any kernel through [`Kernel::function`] or
/// [`Kernel::convolve`] requires a filter of at most eight taps, the width of one 128-bit
/// register. Longer filters are a compile-time error; use [`convolve_naive`] or
/// [`convolve_accumulate_portable`] directly for them.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Scalar nested loop. Ground truth for all other kernels.
    #[default]
    Naive,
    /// One 128-bit register per output, multiply-add pairs and a horizontal reduction.
    Dot,
    /// Two windows stacked into one 256-bit register, two outputs per iteration.
    DotPair,
    /// Tap-by-tap accumulation of 16 outputs per block without horizontal reductions.
    Accumulate,
}

impl Kernel {
    /// All kernels in selection order.
    pub const ALL: [Kernel; 4] = [
        Kernel::Naive,
        Kernel::Dot,
        Kernel::DotPair,
        Kernel::Accumulate,
    ];

    /// The selector name of the kernel.
    pub const fn name(self) -> &'static str {
        match self {
            Kernel::Naive => "naive",
            Kernel::Dot => "dot",
            Kernel::DotPair => "dot-pair",
            Kernel::Accumulate => "accumulate",
        }
    }

    /// The backend that executes this kernel on the current CPU.
    pub fn backend(self) -> Backend {
        match self {
            Kernel::Naive => Backend::Scalar,
            Kernel::Dot | Kernel::DotPair | Kernel::Accumulate if cfg!(target_arch = "aarch64") => {
                // NEON is mandatory on aarch64.
                Backend::Neon
            }
            Kernel::Dot if has_sse4_1() => Backend::Sse41,
            Kernel::DotPair | Kernel::Accumulate if has_avx2() => Backend::Avx2,
            _ => Backend::Portable,
        }
    }

    /// Resolves the kernel to a function pointer for the best available backend.
    ///
    /// Requires `K <= 8`.
    pub fn function<const K: usize>(self) -> ConvolveFn<K> {
        let backend = self.backend();
        log::debug!("Kernel {} with {} taps runs on the {backend} backend", self, K);

        let function: ConvolveFn<K> = match (self, backend) {
            (Kernel::Naive, _) => convolve_naive::<K>,
            #[cfg(target_arch = "x86_64")]
            (Kernel::Dot, Backend::Sse41) => {
                fn wrapper<'a, const K: usize>(
                    filter: &crate::Filter<K>,
                    input: &[i16],
                    output: &'a mut [i16],
                    len: usize,
                ) -> &'a [i16] {
                    // Safety: Only selected after SSE4.1 support has been detected.
                    unsafe { crate::conv::sse4_1::convolve_dot_sse4_1(filter, input, output, len) }
                }
                wrapper::<K>
            }
            #[cfg(target_arch = "x86_64")]
            (Kernel::DotPair, Backend::Avx2) => {
                fn wrapper<'a, const K: usize>(
                    filter: &crate::Filter<K>,
                    input: &[i16],
                    output: &'a mut [i16],
                    len: usize,
                ) -> &'a [i16] {
                    // Safety: Only selected after AVX2 support has been detected.
                    unsafe { crate::conv::avx2::convolve_dot_pair_avx2(filter, input, output, len) }
                }
                wrapper::<K>
            }
            #[cfg(target_arch = "x86_64")]
            (Kernel::Accumulate, Backend::Avx2) => {
                fn wrapper<'a, const K: usize>(
                    filter: &crate::Filter<K>,
                    input: &[i16],
                    output: &'a mut [i16],
                    len: usize,
                ) -> &'a [i16] {
                    // Safety: Only selected after AVX2 support has been detected.
                    unsafe { crate::conv::avx2::convolve_accumulate_avx2(filter, input, output, len) }
                }
                wrapper::<K>
            }
            #[cfg(target_arch = "aarch64")]
            (Kernel::Dot, Backend::Neon) => {
                fn wrapper<'a, const K: usize>(
                    filter: &crate::Filter<K>,
                    input: &[i16],
                    output: &'a mut [i16],
                    len: usize,
                ) -> &'a [i16] {
                    // Safety: NEON is mandatory on aarch64, so it's always available.
                    unsafe { crate::conv::neon::convolve_dot_neon(filter, input, output, len) }
                }
                wrapper::<K>
            }
            #[cfg(target_arch = "aarch64")]
            (Kernel::DotPair, Backend::Neon) => {
                fn wrapper<'a, const K: usize>(
                    filter: &crate::Filter<K>,
                    input: &[i16],
                    output: &'a mut [i16],
                    len: usize,
                ) -> &'a [i16] {
                    // Safety: NEON is mandatory on aarch64, so it's always available.
                    unsafe { crate::conv::neon::convolve_dot_pair_neon(filter, input, output, len) }
                }
                wrapper::<K>
            }
            #[cfg(target_arch = "aarch64")]
            (Kernel::Accumulate, Backend::Neon) => {
                fn wrapper<'a, const K: usize>(
                    filter: &crate::Filter<K>,
                    input: &[i16],
                    output: &'a mut [i16],
                    len: usize,
                ) -> &'a [i16] {
                    // Safety: NEON is mandatory on aarch64, so it's always available.
                    unsafe { crate::conv::neon::convolve_accumulate_neon(filter, input, output, len) }
                }
                wrapper::<K>
            }
            _ => self.portable_function::<K>(),
        };

        function
    }

    /// Resolves the kernel to its portable lane emulation, ignoring the CPU features.
    pub fn portable_function<const K: usize>(self) -> ConvolveFn<K> {
        match self {
            Kernel::Naive => convolve_naive::<K>,
            Kernel::Dot => convolve_dot_portable::<K>,
            Kernel::DotPair => convolve_dot_pair_portable::<K>,
            Kernel::Accumulate => convolve_accumulate_portable::<K>,
        }
    }

    /// Convolves the store's input into `output` and returns the filled prefix.
    ///
    /// ```rust
    /// use simdconv::{Kernel, SignalStore, data};
    ///
    /// let store = SignalStore::reference();
    /// let mut output = vec![0i16; store.output_len()];
    /// let produced = Kernel::Accumulate.convolve(&store, &mut output).unwrap();
    /// assert_eq!(produced, data::EXPECTED);
    /// ```
    pub fn convolve<'a, const K: usize>(
        self,
        store: &SignalStore<K>,
        output: &'a mut [i16],
    ) -> Result<&'a [i16], ConvolveError> {
        let len = store.output_len();
        if output.len() < len {
            return Err(ConvolveError::OutputBufferSize);
        }

        let function = self.function::<K>();
        Ok(function(store.filter(), store.input().as_padded(), output, len))
    }
}

impl core::fmt::Display for Kernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&str> for Kernel {
    type Error = ConvolveError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Kernel::ALL
            .into_iter()
            .find(|kernel| kernel.name() == value)
            .ok_or(ConvolveError::UnknownKernel)
    }
}

impl core::str::FromStr for Kernel {
    type Err = ConvolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kernel::try_from(s)
    }
}

/// Instruction set a kernel runs on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Plain scalar loop.
    Scalar,
    /// Lane emulation with plain arrays.
    Portable,
    /// x86_64 SSE4.1.
    Sse41,
    /// x86_64 AVX2.
    Avx2,
    /// aarch64 NEON.
    Neon,
}

impl core::fmt::Display for Backend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Backend::Scalar => "scalar",
            Backend::Portable => "portable",
            Backend::Sse41 => "SSE4.1",
            Backend::Avx2 => "AVX2",
            Backend::Neon => "NEON",
        })
    }
}

fn has_sse4_1() -> bool {
    #[cfg(all(target_arch = "x86_64", not(feature = "no_std")))]
    {
        std::arch::is_x86_feature_detected!("sse4.1")
    }

    #[cfg(not(all(target_arch = "x86_64", not(feature = "no_std"))))]
    {
        cfg!(all(target_arch = "x86_64", target_feature = "sse4.1"))
    }
}

fn has_avx2() -> bool {
    #[cfg(all(target_arch = "x86_64", not(feature = "no_std")))]
    {
        std::arch::is_x86_feature_detected!("avx2")
    }

    #[cfg(not(all(target_arch = "x86_64", not(feature = "no_std"))))]
    {
        cfg!(all(target_arch = "x86_64", target_feature = "avx2"))
    }
}
