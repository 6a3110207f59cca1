//! Repeats the protocol across increasing particle counts and prints the
//! detection rate for each as CSV, ready for plotting.
//!
//! Short keys count as failures: with very few particles the sifted key is too
//! short to sample. With enough particles the failures come from detecting Eve.

use bb84_sim::bb84::DEFAULT_SAMPLE_FRACTION;
use bb84_sim::{run_batch, BatchConfig};
use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(name = "failure_rate_sweep")]
#[command(about = "BB84 failure rate versus number of particles")]
struct Cli {
    /// Runs per particle count
    #[arg(short, long, default_value = "5")]
    runs: usize,

    /// Largest particle count (exclusive)
    #[arg(short = 'n', long, default_value = "100")]
    max_particles: usize,

    /// Simulate without an eavesdropper
    #[arg(long)]
    no_eavesdropping: bool,

    /// Fraction of the sifted key sacrificed for verification
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_FRACTION)]
    sample_fraction: f64,

    /// Master seed for reproducible sweeps
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = BatchConfig {
        run_count: cli.runs,
        particle_counts: (1..cli.max_particles).collect(),
        eavesdropping: !cli.no_eavesdropping,
        sample_fraction: cli.sample_fraction,
        seed: cli.seed,
    };
    info!(
        "Sweeping {} particle counts, {} runs each, eavesdropping {}",
        config.particle_counts.len(),
        config.run_count,
        config.eavesdropping
    );

    let points = run_batch(&config)?;

    println!("particles,failure_rate");
    for point in points {
        println!("{},{:.4}", point.particle_count, point.failure_rate);
    }
    Ok(())
}
