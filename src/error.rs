use crate::validate::Mismatch;

/// Errors the convolution front end and the validator can return.
#[derive(Copy, Clone, Hash, PartialEq, Eq)]
pub enum ConvolveError {
    /// Input buffer is shorter than the padded signal requires.
    InputBufferSize,
    /// A guard sample of a padded signal is not zero.
    NonZeroPadding,
    /// Output buffer is shorter than the convolution length.
    OutputBufferSize,
    /// Computed and expected sequences have different lengths.
    LengthMismatch { got: usize, expected: usize },
    /// Computed output differs from the expected reference.
    Mismatch(Mismatch),
    /// Kernel name is not part of the kernel set.
    UnknownKernel,
}

impl core::fmt::Display for ConvolveError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InputBufferSize => f.write_str("Input buffer size is too small"),
            Self::NonZeroPadding => f.write_str("Padding of the input signal is not zero"),
            Self::OutputBufferSize => f.write_str("Output buffer size is too small"),
            Self::LengthMismatch { got, expected } => {
                write!(f, "Output length is {got}, expected {expected}")
            }
            Self::Mismatch(mismatch) => core::fmt::Display::fmt(mismatch, f),
            Self::UnknownKernel => f.write_str("Unknown kernel name"),
        }
    }
}

impl core::fmt::Debug for ConvolveError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self, f)
    }
}

#[cfg(not(feature = "no_std"))]
impl std::error::Error for ConvolveError {}
