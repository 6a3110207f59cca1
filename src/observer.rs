//! Event sink for watching a protocol run.
//!
//! The driver notifies an observer after each stage. Observers only ever see
//! shared references, so nothing they do can change the outcome of a run.

use std::fmt;

use log::info;

use crate::bb84::Verification;
use crate::bb84_states::{ParticleState, SharedIndexSet};
use crate::privacy_amplification::key_fingerprint;

/// The three parties of an intercept-resend BB84 exchange.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Party {
    Sender,
    Eavesdropper,
    Receiver,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Party::Sender => "Alice",
            Party::Eavesdropper => "Eve",
            Party::Receiver => "Bob",
        };
        f.write_str(name)
    }
}

/// Receives progress events from a protocol run. All methods default to no-ops.
pub trait ProtocolObserver {
    /// `party` prepared `state` for transmission.
    fn prepared(&mut self, _party: Party, _state: &ParticleState) {}

    /// `party` measured an incoming state and recorded `state`.
    fn measured(&mut self, _party: Party, _state: &ParticleState) {}

    /// Bases of `a` and `b` were compared publicly.
    fn reconciled(&mut self, _a: &ParticleState, _b: &ParticleState, _shared: &SharedIndexSet) {}

    fn verified(&mut self, _verification: &Verification) {}

    /// A final key was agreed on a clean channel.
    fn key_established(&mut self, _key: &[bool]) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProtocolObserver for NullObserver {}

/// Renders every event through the `log` facade at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProtocolObserver for LogObserver {
    fn prepared(&mut self, party: Party, state: &ParticleState) {
        info!(
            "{} chose a random sequence of bases and prepared {} particles\n{}",
            party,
            state.len(),
            state
        );
    }

    fn measured(&mut self, party: Party, state: &ParticleState) {
        info!(
            "{} measured {} particles in random bases\n{}",
            party,
            state.len(),
            state
        );
    }

    fn reconciled(&mut self, a: &ParticleState, b: &ParticleState, shared: &SharedIndexSet) {
        info!(
            "Bases announced, {} of {} positions match (marked with ^)\n{}",
            shared.len(),
            a.len(),
            render_basis_match(a, b, shared)
        );
    }

    fn verified(&mut self, verification: &Verification) {
        if verification.sample_size() == 0 {
            info!(
                "Sifted key of {} bits is too short to sample, key rejected",
                verification.shared_len
            );
            return;
        }
        info!(
            "Compared {} of {} sifted bits: {} match, error rate {:.1}%, interference {}",
            verification.sample_size(),
            verification.shared_len,
            verification.matches,
            verification.error_rate() * 100.0,
            if verification.interference_detected() {
                "detected"
            } else {
                "not detected"
            }
        );
    }

    fn key_established(&mut self, key: &[bool]) {
        info!(
            "Shared key established: {} bits, sha256 {}",
            key.len(),
            key_fingerprint(key)
        );
    }
}

/// Both basis rows followed by a marker row under the matching positions.
pub fn render_basis_match(a: &ParticleState, b: &ParticleState, shared: &SharedIndexSet) -> String {
    let row = |state: &ParticleState| -> String {
        state
            .bases()
            .map(|basis| basis.symbol().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let markers = (0..a.len())
        .map(|i| if shared.contains(i) { "^" } else { " " })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}\n{}\n{}", row(a), row(b), markers.trim_end())
}
