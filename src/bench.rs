//! Benchmark harness: drives one kernel repeatedly over a signal store.

use std::time::{Duration, Instant};

use alloc::vec::Vec;

use crate::{
    ConvolveError, Kernel, SignalStore,
    kernel::Backend,
    validate::{Mismatch, mismatches, validate},
};

/// How long a benchmark runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Budget {
    /// A fixed number of invocations. Zero runs nothing.
    Iterations(u64),
    /// Invocations until the wall-clock time is used up. At least one invocation always runs.
    Duration(Duration),
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Iterations(10_000_000)
    }
}

/// Validation policy of a benchmark run.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Validation {
    /// Outputs are not checked.
    #[default]
    Off,
    /// Every output is checked and the run aborts at the first mismatch.
    FailFast,
    /// Every output is checked, mismatches are recorded and the run continues.
    Verbose,
}

/// Configuration of a benchmark run.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BenchmarkConfig {
    pub kernel: Kernel,
    pub budget: Budget,
    pub validation: Validation,
}

/// Outcome of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkReport {
    pub kernel: Kernel,
    pub backend: Backend,
    /// Number of completed kernel invocations.
    pub invocations: u64,
    /// Wall-clock time of all invocations, including validation if enabled.
    pub elapsed: Duration,
    pub validation: Validation,
    /// Invocations whose output differed from the expected reference.
    pub failed_invocations: u64,
    /// All mismatches of the first failing invocation.
    pub first_mismatches: Vec<Mismatch>,
}

impl BenchmarkReport {
    /// Average time per invocation in nanoseconds.
    pub fn nanos_per_invocation(&self) -> f64 {
        if self.invocations == 0 {
            return 0.0;
        }
        self.elapsed.as_nanos() as f64 / self.invocations as f64
    }

    /// Average number of invocations per second.
    pub fn invocations_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.invocations as f64 / secs
    }

    /// Returns `true` if the timing includes validation overhead.
    pub fn includes_validation(&self) -> bool {
        self.validation != Validation::Off
    }
}

/// Runs the configured kernel over `store`, reusing `output` for every invocation.
///
/// With [`Validation::FailFast`] the first mismatching invocation aborts the run with
/// [`ConvolveError::Mismatch`].
pub fn run_benchmark<const K: usize>(
    config: &BenchmarkConfig,
    store: &SignalStore<K>,
    output: &mut [i16],
) -> Result<BenchmarkReport, ConvolveError> {
    let len = store.output_len();
    if output.len() < len {
        return Err(ConvolveError::OutputBufferSize);
    }

    let function = config.kernel.function::<K>();
    let backend = config.kernel.backend();
    let filter = store.filter();
    let input = store.input().as_padded();
    let expected = store.expected();

    let mut report = BenchmarkReport {
        kernel: config.kernel,
        backend,
        invocations: 0,
        elapsed: Duration::ZERO,
        validation: config.validation,
        failed_invocations: 0,
        first_mismatches: Vec::new(),
    };

    log::debug!(
        "Running kernel {} on {backend} with budget {:?}",
        config.kernel,
        config.budget
    );

    let start = Instant::now();
    loop {
        let done = match config.budget {
            Budget::Iterations(count) => report.invocations >= count,
            Budget::Duration(duration) => report.invocations > 0 && start.elapsed() >= duration,
        };
        if done {
            break;
        }

        let produced = function(filter, input, output, len);

        match config.validation {
            Validation::Off => {}
            Validation::FailFast => {
                if let Err(error) = validate(produced, expected) {
                    log::error!("Invocation {} failed validation", report.invocations);
                    return Err(error);
                }
            }
            Validation::Verbose => {
                let mut found = mismatches(produced, expected).peekable();
                if found.peek().is_some() {
                    if report.failed_invocations == 0 {
                        report.first_mismatches.extend(found);
                    }
                    report.failed_invocations += 1;
                }
            }
        }

        report.invocations += 1;
    }
    report.elapsed = start.elapsed();

    Ok(report)
}
