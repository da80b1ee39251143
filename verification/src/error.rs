use thiserror::Error;
use tokenchain_types::{RequestId, TransactionHash};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Certificate, Merkle path or authenticator signature did not check out.
    #[error("cryptographic failure: {0}")]
    CryptographicFailure(String),

    /// The oracle answered for a different state than the one asked about.
    #[error("source state mismatch: asked for request {expected}, proof is for {answered}")]
    SourceStateMismatch {
        expected: RequestId,
        answered: RequestId,
    },

    /// The state was consumed by a transition other than the one under test.
    #[error("transaction mismatch (already spent elsewhere): state consumed by {recorded}, expected {expected}")]
    TransactionMismatch {
        expected: TransactionHash,
        recorded: TransactionHash,
    },

    #[error("cryptographic failure: stored proof for request {0} does not show inclusion")]
    NotIncluded(RequestId),
}
