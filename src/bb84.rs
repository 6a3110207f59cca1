//! The BB84 pipeline stages: preparation, measurement, basis reconciliation
//! and sample-based verification.
//!
//! Every stage takes the random source explicitly, so a run driven by a
//! seeded generator is fully reproducible.

use rand::seq::index;
use rand::Rng;

use crate::bb84_states::{
    generate_bases, random_bits, Basis, Particle, ParticleState, SharedIndexSet,
};
use crate::error::{ensure_same_len, Bb84Error, Result};

/// Fraction of the sifted key sacrificed for verification when none is given.
pub const DEFAULT_SAMPLE_FRACTION: f64 = 0.5;

/// Tolerance on the sampled match rate for a channel to count as clean.
pub const MATCH_TOLERANCE: f64 = 1e-9;

/// Prepares `count` particles with random bases and random bit values.
pub fn prepare<R: Rng + ?Sized>(count: usize, rng: &mut R) -> ParticleState {
    let bases = generate_bases(count, rng);
    let bits = random_bits(count, rng);
    bases
        .into_iter()
        .zip(bits)
        .map(|(basis, bit)| Particle::new(basis, bit))
        .collect()
}

/// Measures every particle of `source` in a freshly drawn random basis.
///
/// Positions where the drawn basis matches the source keep their bit; the
/// rest collapse to a uniformly random bit. Used for both the receiver and
/// an intercepting eavesdropper.
pub fn measure<R: Rng + ?Sized>(source: &ParticleState, rng: &mut R) -> ParticleState {
    let bases = generate_bases(source.len(), rng);
    source
        .iter()
        .zip(bases)
        .map(|(particle, basis)| particle.measure_in(basis, rng))
        .collect()
}

/// Measures `source` with caller-chosen bases, one per particle.
pub fn measure_with_bases<R: Rng + ?Sized>(
    source: &ParticleState,
    bases: &[Basis],
    rng: &mut R,
) -> Result<ParticleState> {
    ensure_same_len(source.len(), bases.len())?;
    Ok(source
        .iter()
        .zip(bases)
        .map(|(particle, &basis)| particle.measure_in(basis, rng))
        .collect())
}

/// Public basis announcement: the positions where `a` and `b` chose the same
/// basis, in ascending order. Bit values are not compared.
pub fn reconcile(a: &ParticleState, b: &ParticleState) -> Result<SharedIndexSet> {
    ensure_same_len(a.len(), b.len())?;
    let shared = a
        .bases()
        .zip(b.bases())
        .enumerate()
        .filter_map(|(i, (x, y))| (x == y).then_some(i))
        .collect();
    Ok(SharedIndexSet::from_sorted(shared))
}

/// Outcome of comparing a random sample of the sifted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Size of the sifted key the sample was drawn from.
    pub shared_len: usize,
    /// Sampled positions, ascending.
    pub sample: Vec<usize>,
    /// Sampled positions where both parties hold the same bit.
    pub matches: usize,
}

impl Verification {
    pub fn sample_size(&self) -> usize {
        self.sample.len()
    }

    /// Fraction of sampled bits that agree. Zero for an empty sample.
    pub fn match_rate(&self) -> f64 {
        if self.sample.is_empty() {
            return 0.0;
        }
        self.matches as f64 / self.sample.len() as f64
    }

    /// Quantum bit error rate observed on the sample.
    pub fn error_rate(&self) -> f64 {
        if self.sample.is_empty() {
            return 0.0;
        }
        1.0 - self.match_rate()
    }

    /// `true` when the key is unusable: nothing to sample, or any sampled
    /// mismatch.
    pub fn interference_detected(&self) -> bool {
        self.sample.is_empty() || (1.0 - self.match_rate()).abs() > MATCH_TOLERANCE
    }
}

/// Number of sifted bits sacrificed for verification.
///
/// Rounds half to even, so a single shared bit at the default fraction yields
/// an empty sample.
pub fn sample_size(shared_len: usize, sample_fraction: f64) -> usize {
    (sample_fraction * shared_len as f64).round_ties_even() as usize
}

fn validate_fraction(sample_fraction: f64) -> Result<()> {
    if !(sample_fraction > 0.0 && sample_fraction <= 1.0) {
        return Err(Bb84Error::InvalidArgument(format!(
            "sample fraction must be in (0, 1], got {}",
            sample_fraction
        )));
    }
    Ok(())
}

/// Samples `shared` without replacement and compares both parties' bits at
/// the sampled positions.
pub fn sample_and_compare<R: Rng + ?Sized>(
    shared: &SharedIndexSet,
    a: &ParticleState,
    b: &ParticleState,
    sample_fraction: f64,
    rng: &mut R,
) -> Result<Verification> {
    validate_fraction(sample_fraction)?;
    ensure_same_len(a.len(), b.len())?;
    if let Some(&last) = shared.indices().last() {
        if last >= a.len() {
            return Err(Bb84Error::InvalidArgument(format!(
                "shared index {} out of range for {} particles",
                last,
                a.len()
            )));
        }
    }

    let size = sample_size(shared.len(), sample_fraction);
    let mut sample: Vec<usize> = index::sample(rng, shared.len(), size)
        .into_iter()
        .map(|k| shared.indices()[k])
        .collect();
    sample.sort_unstable();

    let a = a.particles();
    let b = b.particles();
    let matches = sample.iter().filter(|&&i| a[i].bit == b[i].bit).count();

    Ok(Verification {
        shared_len: shared.len(),
        sample,
        matches,
    })
}

/// Returns the verdict for a sifted key: `true` if interference was detected
/// or the key was too short to sample.
pub fn verify<R: Rng + ?Sized>(
    shared: &SharedIndexSet,
    a: &ParticleState,
    b: &ParticleState,
    sample_fraction: f64,
    rng: &mut R,
) -> Result<bool> {
    Ok(sample_and_compare(shared, a, b, sample_fraction, rng)?.interference_detected())
}
