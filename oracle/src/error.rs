use std::fmt;
use thiserror::Error;

/// Why the oracle refused a commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The request id already has a different transaction committed.
    LeafConflict,
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeafConflict => write!(f, "leaf already has a different value"),
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("rejected: {0}")]
    Rejected(RejectReason),

    /// Transport failure, malformed answer or an out-of-contract status.
    #[error("network unavailable (retry later): {0}")]
    NetworkUnavailable(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_))
    }
}
