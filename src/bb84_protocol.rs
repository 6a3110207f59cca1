//! End-to-end protocol runs and repeated-run batches.
//!
//! A run wires the sender, an optional intercept-resend eavesdropper and the
//! receiver together, reconciles bases and samples the sifted key. A batch
//! repeats runs across particle counts and reports the fraction of runs that
//! flagged interference, which is the series a failure-rate plot needs.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bb84::{
    measure, prepare, reconcile, sample_and_compare, Verification, DEFAULT_SAMPLE_FRACTION,
};
use crate::bb84_states::{ParticleState, SharedIndexSet};
use crate::error::{Bb84Error, Result};
use crate::observer::{NullObserver, Party, ProtocolObserver};
use crate::privacy_amplification::amplify;

/// Configuration for a single protocol run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of particles the sender prepares.
    pub particle_count: usize,
    /// Whether an eavesdropper intercepts and resends every particle.
    pub eavesdropping: bool,
    /// Fraction of the sifted key sacrificed for verification, in (0, 1].
    pub sample_fraction: f64,
    /// Compress the established key with a Toeplitz hash. Quadratic in the
    /// key length, so off unless asked for.
    pub amplify_key: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particle_count: 10,
            eavesdropping: false,
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            amplify_key: false,
        }
    }
}

impl SimConfig {
    pub fn new(particle_count: usize, eavesdropping: bool) -> Self {
        Self {
            particle_count,
            eavesdropping,
            ..Self::default()
        }
    }

    pub fn with_sample_fraction(mut self, sample_fraction: f64) -> Self {
        self.sample_fraction = sample_fraction;
        self
    }

    pub fn with_amplified_key(mut self) -> Self {
        self.amplify_key = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.particle_count < 1 {
            return Err(Bb84Error::InvalidArgument(
                "particle count must be at least 1".to_string(),
            ));
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(Bb84Error::InvalidArgument(format!(
                "sample fraction must be in (0, 1], got {}",
                self.sample_fraction
            )));
        }
        Ok(())
    }
}

/// Everything a single run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolOutcome {
    pub particle_count: usize,
    pub eavesdropping: bool,
    /// Positions where sender and receiver bases matched.
    pub sifted_len: usize,
    pub verification: Verification,
    /// The verdict: interference detected or key unusable.
    pub interference_detected: bool,
    /// Final key, present only on a clean channel.
    pub key: Option<Vec<bool>>,
}

impl ProtocolOutcome {
    pub fn sample_size(&self) -> usize {
        self.verification.sample_size()
    }

    /// Error rate observed on the verification sample.
    pub fn qber(&self) -> f64 {
        self.verification.error_rate()
    }
}

/// Bits of `state` at the sifted positions the verification sample did not
/// reveal. On a clean channel this is the same for both parties.
pub fn raw_key(
    shared: &SharedIndexSet,
    verification: &Verification,
    state: &ParticleState,
) -> Vec<bool> {
    shared
        .iter()
        .copied()
        .filter(|i| verification.sample.binary_search(i).is_err())
        .filter_map(|i| state.get(i).map(|p| p.bit))
        .collect()
}

/// Runs the protocol once with the thread-local generator and returns the
/// verdict: `true` if interference was detected or the key is unusable.
pub fn run(particle_count: usize, eavesdropping: bool, sample_fraction: f64) -> Result<bool> {
    let config = SimConfig::new(particle_count, eavesdropping).with_sample_fraction(sample_fraction);
    let outcome = run_with(&config, &mut rand::thread_rng(), &mut NullObserver)?;
    Ok(outcome.interference_detected)
}

/// Runs the protocol once, drawing all randomness from `rng` and reporting
/// each stage to `observer`.
pub fn run_with<R, O>(config: &SimConfig, rng: &mut R, observer: &mut O) -> Result<ProtocolOutcome>
where
    R: Rng + ?Sized,
    O: ProtocolObserver + ?Sized,
{
    config.validate()?;
    trace!(
        "BB84 run: {} particles, eavesdropping {}",
        config.particle_count,
        config.eavesdropping
    );

    let sender = prepare(config.particle_count, rng);
    observer.prepared(Party::Sender, &sender);

    let receiver = if config.eavesdropping {
        let intercepted = measure(&sender, rng);
        observer.measured(Party::Eavesdropper, &intercepted);
        measure(&intercepted, rng)
    } else {
        measure(&sender, rng)
    };
    observer.measured(Party::Receiver, &receiver);

    let shared = reconcile(&sender, &receiver)?;
    observer.reconciled(&sender, &receiver, &shared);

    let verification = sample_and_compare(&shared, &sender, &receiver, config.sample_fraction, rng)?;
    observer.verified(&verification);
    let interference_detected = verification.interference_detected();

    let key = if interference_detected {
        None
    } else {
        let raw = raw_key(&shared, &verification, &sender);
        let key = if config.amplify_key {
            amplify(&raw, raw.len() / 2, rng)?
        } else {
            raw
        };
        observer.key_established(&key);
        Some(key)
    };

    debug!(
        "BB84 run finished: sifted {} of {}, sampled {}, matches {}, interference {}",
        shared.len(),
        config.particle_count,
        verification.sample_size(),
        verification.matches,
        interference_detected
    );

    Ok(ProtocolOutcome {
        particle_count: config.particle_count,
        eavesdropping: config.eavesdropping,
        sifted_len: shared.len(),
        verification,
        interference_detected,
        key,
    })
}

/// Configuration for repeated runs across particle counts.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Runs per particle count.
    pub run_count: usize,
    pub particle_counts: Vec<usize>,
    pub eavesdropping: bool,
    pub sample_fraction: f64,
    /// Master seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            run_count: 5,
            particle_counts: (1..100).collect(),
            eavesdropping: true,
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            seed: None,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.run_count < 1 {
            return Err(Bb84Error::InvalidArgument(
                "run count must be at least 1".to_string(),
            ));
        }
        for &particle_count in &self.particle_counts {
            SimConfig {
                particle_count,
                eavesdropping: self.eavesdropping,
                sample_fraction: self.sample_fraction,
                amplify_key: false,
            }
            .validate()?;
        }
        Ok(())
    }
}

/// Aggregated verdicts for one particle count.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPoint {
    pub particle_count: usize,
    pub runs: usize,
    /// Runs that flagged interference or an unusable key.
    pub detections: usize,
    /// detections / runs
    pub failure_rate: f64,
}

/// Runs `run_count` protocol runs for every particle count and returns the
/// failure rate of each, in input order.
pub fn batch(run_count: usize, particle_counts: &[usize], eavesdropping: bool) -> Result<Vec<f64>> {
    let config = BatchConfig {
        run_count,
        particle_counts: particle_counts.to_vec(),
        eavesdropping,
        ..BatchConfig::default()
    };
    Ok(run_batch(&config)?
        .into_iter()
        .map(|point| point.failure_rate)
        .collect())
}

/// Runs a batch. Every run gets its own generator seeded from a master
/// stream, so a seeded batch gives the same points with or without the
/// `parallel` feature.
pub fn run_batch(config: &BatchConfig) -> Result<Vec<BatchPoint>> {
    config.validate()?;
    let mut master = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    config
        .particle_counts
        .iter()
        .map(|&particle_count| -> Result<BatchPoint> {
            let seeds: Vec<u64> = (0..config.run_count).map(|_| master.gen()).collect();
            let sim = SimConfig {
                particle_count,
                eavesdropping: config.eavesdropping,
                sample_fraction: config.sample_fraction,
                amplify_key: false,
            };
            let detections = count_detections(&sim, &seeds)?;
            debug!(
                "{} particles: {}/{} runs flagged",
                particle_count, detections, config.run_count
            );
            Ok(BatchPoint {
                particle_count,
                runs: config.run_count,
                detections,
                failure_rate: detections as f64 / config.run_count as f64,
            })
        })
        .collect()
}

fn run_seeded(config: &SimConfig, seed: u64) -> Result<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(run_with(config, &mut rng, &mut NullObserver)?.interference_detected)
}

#[cfg(feature = "parallel")]
fn count_detections(config: &SimConfig, seeds: &[u64]) -> Result<usize> {
    use rayon::prelude::*;

    seeds
        .par_iter()
        .map(|&seed| run_seeded(config, seed).map(usize::from))
        .try_reduce(|| 0, |a, b| Ok(a + b))
}

#[cfg(not(feature = "parallel"))]
fn count_detections(config: &SimConfig, seeds: &[u64]) -> Result<usize> {
    seeds.iter().try_fold(0, |acc, &seed| {
        Ok(acc + usize::from(run_seeded(config, seed)?))
    })
}
