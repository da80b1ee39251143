use std::fmt;
use thiserror::Error;
use tokenchain_types::Address;

/// Position of a link in a token chain, used in error reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainLink {
    Genesis,
    History(usize),
    CurrentState,
    PackageHop(usize),
}

impl fmt::Display for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Genesis => write!(f, "genesis"),
            Self::History(i) => write!(f, "history[{i}]"),
            Self::CurrentState => write!(f, "current state"),
            Self::PackageHop(i) => write!(f, "package hop {i}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain broken at {at}: {reason}")]
    Broken { at: ChainLink, reason: String },

    #[error("signer does not own the state being spent (state belongs to {owner})")]
    NotOwner { owner: Address },

    #[error("chain broken: received {proofs} proofs for a package of {hops} hops")]
    ProofCountMismatch { proofs: usize, hops: usize },

    #[error("unsupported token format version {0}")]
    UnsupportedVersion(u32),
}

impl ChainError {
    pub(crate) fn broken(at: ChainLink, reason: impl Into<String>) -> Self {
        Self::Broken {
            at,
            reason: reason.into(),
        }
    }
}
