//! Output validation against an expected reference.

use crate::ConvolveError;

/// A single differing output element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Mismatch {
    /// Output index.
    pub index: usize,
    /// Value the kernel produced.
    pub got: i16,
    /// Value of the expected reference.
    pub expected: i16,
}

impl core::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Error at index {}, got {}, expected {}",
            self.index, self.got, self.expected
        )
    }
}

/// Compares `output` with `expected` and stops at the first difference.
///
/// ```rust
/// use simdconv::{ConvolveError, Mismatch, validate};
///
/// assert!(validate(&[1, 2, 3], &[1, 2, 3]).is_ok());
/// assert_eq!(
///     validate(&[1, 5, 3], &[1, 2, 3]),
///     Err(ConvolveError::Mismatch(Mismatch { index: 1, got: 5, expected: 2 })),
/// );
/// ```
pub fn validate(output: &[i16], expected: &[i16]) -> Result<(), ConvolveError> {
    check_lengths(output, expected)?;

    match mismatches(output, expected).next() {
        Some(mismatch) => Err(ConvolveError::Mismatch(mismatch)),
        None => Ok(()),
    }
}

/// Iterates over every mismatch between `output` and `expected`.
///
/// Elements beyond the shorter of both sequences are not compared.
pub fn mismatches<'a>(
    output: &'a [i16],
    expected: &'a [i16],
) -> impl Iterator<Item = Mismatch> + 'a {
    output
        .iter()
        .zip(expected)
        .enumerate()
        .filter(|(_, (got, expected))| got != expected)
        .map(|(index, (&got, &expected))| Mismatch {
            index,
            got,
            expected,
        })
}

fn check_lengths(output: &[i16], expected: &[i16]) -> Result<(), ConvolveError> {
    if output.len() != expected.len() {
        return Err(ConvolveError::LengthMismatch {
            got: output.len(),
            expected: expected.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec::Vec};

    use super::*;
    use crate::data;

    #[test]
    fn test_identical_sequences_pass() {
        assert_eq!(validate(&data::EXPECTED, &data::EXPECTED), Ok(()));
        assert_eq!(mismatches(&data::EXPECTED, &data::EXPECTED).count(), 0);
    }

    #[test]
    fn test_single_difference_is_reported_exactly() {
        for index in 0..data::OUTPUT_LEN {
            let mut output = data::EXPECTED;
            output[index] = output[index].wrapping_add(1);

            assert_eq!(
                validate(&output, &data::EXPECTED),
                Err(ConvolveError::Mismatch(Mismatch {
                    index,
                    got: data::EXPECTED[index].wrapping_add(1),
                    expected: data::EXPECTED[index],
                }))
            );
        }
    }

    #[test]
    fn test_first_mismatch_short_circuits() {
        let mut output = data::EXPECTED;
        output[3] = 0;
        output[17] = 0;

        let Err(ConvolveError::Mismatch(mismatch)) = validate(&output, &data::EXPECTED) else {
            panic!("expected a mismatch");
        };
        assert_eq!(mismatch.index, 3);

        let all: Vec<usize> = mismatches(&output, &data::EXPECTED)
            .map(|mismatch| mismatch.index)
            .collect();
        assert_eq!(all, [3, 17]);
    }

    #[test]
    fn test_length_difference() {
        assert_eq!(
            validate(&[1, 2], &[1, 2, 3]),
            Err(ConvolveError::LengthMismatch {
                got: 2,
                expected: 3
            })
        );
    }

    #[test]
    fn test_mismatch_message() {
        let mismatch = Mismatch {
            index: 4,
            got: -3,
            expected: 12,
        };
        assert_eq!(mismatch.to_string(), "Error at index 4, got -3, expected 12");
        assert_eq!(
            ConvolveError::Mismatch(mismatch).to_string(),
            "Error at index 4, got -3, expected 12"
        );
    }
}
