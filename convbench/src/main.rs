use std::time::Duration;

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{debug, info};
use simdconv::{
    Kernel, SignalStore,
    bench::{BenchmarkConfig, BenchmarkReport, Budget, Validation, run_benchmark},
    mismatches,
};

#[derive(Parser, Debug)]
#[command(name = "convbench")]
#[command(about = "Benchmark scalar and SIMD FIR convolution kernels", long_about = None)]
struct Cli {
    /// Kernel to run.
    #[arg(value_enum, default_value_t = KernelType::Naive)]
    kernel: KernelType,
    /// Validate the output of every timed invocation and abort on the first mismatch.
    #[arg(long)]
    validate: bool,
    /// Validate every timed invocation, print all mismatches and keep going.
    #[arg(long, conflicts_with = "validate")]
    verbose_diagnostics: bool,
    /// Number of timed invocations.
    #[arg(long, value_name = "COUNT", default_value_t = 10_000_000)]
    iterations: u64,
    /// Run for a wall-clock budget instead of a fixed number of invocations.
    #[arg(long, value_name = "MS", conflicts_with = "iterations")]
    duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KernelType {
    Naive,
    Dot,
    DotPair,
    Accumulate,
}

impl From<KernelType> for Kernel {
    fn from(value: KernelType) -> Self {
        match value {
            KernelType::Naive => Kernel::Naive,
            KernelType::Dot => Kernel::Dot,
            KernelType::DotPair => Kernel::DotPair,
            KernelType::Accumulate => Kernel::Accumulate,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let kernel = Kernel::from(cli.kernel);
    let store = SignalStore::reference();
    let mut output = vec![0i16; store.output_len()];

    println!("Kernel: {kernel} (backend: {})", kernel.backend());

    // Single checked run before timing.
    let produced = match kernel.convolve(&store, &mut output) {
        Ok(produced) => produced,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    };
    let mut failed = false;
    for mismatch in mismatches(produced, store.expected()) {
        println!("{mismatch}");
        failed = true;
    }
    if failed {
        std::process::exit(1);
    }
    debug!("Warm-up output matches the expected reference");

    let budget = match cli.duration_ms {
        Some(ms) => Budget::Duration(Duration::from_millis(ms)),
        None => Budget::Iterations(cli.iterations),
    };
    let validation = if cli.verbose_diagnostics {
        Validation::Verbose
    } else if cli.validate {
        Validation::FailFast
    } else {
        Validation::Off
    };
    let config = BenchmarkConfig {
        kernel,
        budget,
        validation,
    };

    info!("Starting benchmark with {budget:?}");

    let report = match run_benchmark(&config, &store, &mut output) {
        Ok(report) => report,
        Err(error) => {
            println!("{error}");
            eprintln!("Validation failed, aborting benchmark");
            std::process::exit(1);
        }
    };

    print_report(&report);

    if report.failed_invocations > 0 {
        std::process::exit(1);
    }
}

fn print_report(report: &BenchmarkReport) {
    for mismatch in &report.first_mismatches {
        println!("{mismatch}");
    }
    if report.failed_invocations > 0 {
        println!(
            "Failed invocations: {} of {}",
            report.failed_invocations, report.invocations
        );
    }

    let annotation = if report.includes_validation() {
        " (including validation)"
    } else {
        ""
    };

    println!("Invocations: {}", report.invocations);
    println!(
        "Elapsed: {:.3} ms{annotation}",
        report.elapsed.as_secs_f64() * 1000.0
    );
    println!(
        "Time per invocation: {:.2} ns{annotation}",
        report.nanos_per_invocation()
    );
    println!(
        "Throughput: {:.0} invocations/s{annotation}",
        report.invocations_per_second()
    );
}
