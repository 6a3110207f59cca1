//! Error types for the BB84 simulation.

use thiserror::Error;

/// Errors that abort a single protocol run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Bb84Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Length mismatch: left has {left} entries, right has {right}")]
    LengthMismatch { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, Bb84Error>;

/// Fails with `LengthMismatch` unless both lengths are equal.
pub(crate) fn ensure_same_len(left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Bb84Error::LengthMismatch { left, right });
    }
    Ok(())
}
