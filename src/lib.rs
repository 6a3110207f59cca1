//! # bb84-sim
//!
//! Simulation of the BB84 quantum key distribution protocol between a sender
//! and a receiver, optionally with an intercept-resend eavesdropper.
//!
//! Qubits are modelled abstractly as `(basis, bit)` pairs: measuring in the
//! preparation basis returns the encoded bit, measuring in the conjugate basis
//! collapses to a random bit. A run prepares, measures, reconciles bases and
//! samples the sifted key; any sampled disagreement (or a key too short to
//! sample) is reported as interference.
//!
//! ```no_run
//! use bb84_sim::bb84::DEFAULT_SAMPLE_FRACTION;
//! use bb84_sim::{batch, run, Bb84Error};
//!
//! let detected = run(100, true, DEFAULT_SAMPLE_FRACTION)?;
//! let failure_rates = batch(20, &[10, 50, 100], true)?;
//! # Ok::<(), Bb84Error>(())
//! ```

pub mod bb84;
pub mod bb84_protocol;
pub mod bb84_states;
pub mod error;
pub mod observer;
pub mod privacy_amplification;
#[cfg(test)]
mod tests;

pub use bb84_protocol::{
    batch, run, run_batch, run_with, BatchConfig, BatchPoint, ProtocolOutcome, SimConfig,
};
pub use bb84_states::{Basis, Particle, ParticleState, Qubit, SharedIndexSet};
pub use error::{Bb84Error, Result};

pub mod prelude {
    pub use crate::bb84::*;
    pub use crate::bb84_protocol::*;
    pub use crate::bb84_states::*;
    pub use crate::error::Bb84Error;
    pub use crate::observer::*;
}
