//! Errors reported by the toolkit.

use crate::hash::Id;

/// The errors that operations in this crate can surface.
///
/// Each variant is a *kind* the caller can act on, not a wrapper around
/// whatever went wrong internally: a block that fails validation reports
/// exactly why, and the chain it was offered to is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed bytes: bad length, an unknown tag, or an encoding of a
    /// point or scalar that is not canonical.
    #[error("malformed encoding")]
    Decoding,

    /// A zero-knowledge proof did not verify.
    #[error("proof does not verify")]
    BadProof,

    /// A payload referenced a stack that is not in the derived state.
    #[error("unknown stack {0}")]
    UnknownStack(Id),

    /// An operation was applied to stacks of inconsistent or unusable sizes.
    #[error("mismatched stack shape")]
    ShapeMismatch,

    /// A block violates the chain's structural rules.
    #[error("chain integrity: {0}")]
    ChainIntegrity(&'static str),

    /// Token recovery was attempted on a mask that is not fully unmasked,
    /// or the token lies outside the recovery bound.
    #[error("token recovery exhausted")]
    ExhaustedRecovery,

    /// A random-number spec does not parse.
    #[error("bad rng spec")]
    BadSpec,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
