use std::fmt;

use rand::Rng;

use crate::error::{ensure_same_len, Bb84Error, Result};

/// One of the two conjugate measurement orientations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Basis {
    /// Computational basis, |0> and |1>.
    Rectilinear,
    /// Hadamard basis, |+> and |->.
    Diagonal,
}

impl Basis {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen::<bool>() {
            Basis::Diagonal
        } else {
            Basis::Rectilinear
        }
    }

    /// Single-letter symbol, `Z` for rectilinear and `X` for diagonal.
    pub fn symbol(self) -> char {
        match self {
            Basis::Rectilinear => 'Z',
            Basis::Diagonal => 'X',
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The four BB84 polarisation states.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Qubit {
    Zero,
    One,
    Plus,
    Minus,
}

impl Qubit {
    /// Encodes `bit` in `basis`.
    pub fn encode(bit: bool, basis: Basis) -> Self {
        match (basis, bit) {
            (Basis::Rectilinear, false) => Qubit::Zero,
            (Basis::Rectilinear, true) => Qubit::One,
            (Basis::Diagonal, false) => Qubit::Plus,
            (Basis::Diagonal, true) => Qubit::Minus,
        }
    }

    pub fn basis(self) -> Basis {
        match self {
            Qubit::Zero | Qubit::One => Basis::Rectilinear,
            Qubit::Plus | Qubit::Minus => Basis::Diagonal,
        }
    }

    pub fn bit(self) -> bool {
        matches!(self, Qubit::One | Qubit::Minus)
    }

    /// Measures the qubit in `basis`.
    ///
    /// Measuring in the preparation basis returns the encoded bit. Measuring
    /// in the conjugate basis collapses to a uniformly random outcome.
    pub fn measure<R: Rng + ?Sized>(self, basis: Basis, rng: &mut R) -> bool {
        match (self, basis) {
            (Qubit::Zero, Basis::Rectilinear) => false,
            (Qubit::One, Basis::Rectilinear) => true,
            (Qubit::Plus, Basis::Diagonal) => false,
            (Qubit::Minus, Basis::Diagonal) => true,
            (Qubit::Zero | Qubit::One, Basis::Diagonal)
            | (Qubit::Plus | Qubit::Minus, Basis::Rectilinear) => rng.gen(),
        }
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ket = match self {
            Qubit::Zero => "|0>",
            Qubit::One => "|1>",
            Qubit::Plus => "|+>",
            Qubit::Minus => "|->",
        };
        f.write_str(ket)
    }
}

/// A party's committed record for one particle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Particle {
    pub basis: Basis,
    pub bit: bool,
}

impl Particle {
    pub fn new(basis: Basis, bit: bool) -> Self {
        Self { basis, bit }
    }

    pub fn qubit(self) -> Qubit {
        Qubit::encode(self.bit, self.basis)
    }

    /// The record a party obtains by measuring this particle in `basis`.
    pub fn measure_in<R: Rng + ?Sized>(self, basis: Basis, rng: &mut R) -> Particle {
        Particle {
            basis,
            bit: self.qubit().measure(basis, rng),
        }
    }
}

/// Ordered `(basis, bit)` records, one per exchanged particle.
///
/// Position `i` in every state derived from the same run refers to the same
/// physical particle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticleState {
    particles: Vec<Particle>,
}

impl ParticleState {
    /// Builds a state from explicit bases and bits.
    pub fn from_parts(bases: Vec<Basis>, bits: Vec<bool>) -> Result<Self> {
        ensure_same_len(bases.len(), bits.len())?;
        Ok(bases
            .into_iter()
            .zip(bits)
            .map(|(basis, bit)| Particle::new(basis, bit))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn bases(&self) -> impl Iterator<Item = Basis> + '_ {
        self.particles.iter().map(|p| p.basis)
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.particles.iter().map(|p| p.bit)
    }
}

impl FromIterator<Particle> for ParticleState {
    fn from_iter<I: IntoIterator<Item = Particle>>(iter: I) -> Self {
        Self {
            particles: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ParticleState {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}

impl fmt::Display for ParticleState {
    /// Two rows, bases on top and bit values underneath.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "basis:")?;
        for p in &self.particles {
            write!(f, " {}", p.basis)?;
        }
        write!(f, "\nvalue:")?;
        for p in &self.particles {
            write!(f, " {}", u8::from(p.bit))?;
        }
        Ok(())
    }
}

/// Strictly increasing positions where two parties chose the same basis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedIndexSet {
    indices: Vec<usize>,
}

impl SharedIndexSet {
    /// Wraps `indices`, rejecting any sequence that is not strictly increasing.
    pub fn new(indices: Vec<usize>) -> Result<Self> {
        if let Some(w) = indices.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Bb84Error::InvalidArgument(format!(
                "shared indices must be strictly increasing, found {} before {}",
                w[0], w[1]
            )));
        }
        Ok(Self { indices })
    }

    /// Caller guarantees ascending, duplicate-free input.
    pub(crate) fn from_sorted(indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.indices.iter()
    }
}

/// Draws `count` independent, uniformly random bases.
pub fn generate_bases<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Basis> {
    (0..count).map(|_| Basis::random(rng)).collect()
}

/// Draws `count` independent, uniformly random bits.
pub fn random_bits<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<bool> {
    (0..count).map(|_| rng.gen()).collect()
}
