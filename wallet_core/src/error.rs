use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokenchain_chain::ChainError;
use tokenchain_oracle::OracleError;
use tokenchain_types::Address;
use tokenchain_verification::VerificationError;

/// Failure categories reported to users and scripts.
///
/// Each kind has a distinct label and exit code so that "retry later"
/// can never be confused with "this transfer is permanently invalid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Local structural defect in a token file.
    ChainBroken,
    CryptographicFailure,
    /// The oracle answered for a different state.
    SourceStateMismatch,
    /// Definitive double-spend or staleness answer.
    TransactionMismatch,
    NetworkUnavailable,
    /// Immutable-leaf conflict or other protocol rejection.
    Rejected,
    Other,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChainBroken => "chain broken",
            Self::CryptographicFailure => "cryptographic failure",
            Self::SourceStateMismatch => "source state mismatch",
            Self::TransactionMismatch => "transaction mismatch (already spent elsewhere)",
            Self::NetworkUnavailable => "network unavailable (retry later)",
            Self::Rejected => "rejected",
            Self::Other => "error",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ChainBroken => 2,
            Self::CryptographicFailure => 3,
            Self::SourceStateMismatch => 4,
            Self::TransactionMismatch => 5,
            Self::NetworkUnavailable => 6,
            Self::Rejected => 7,
            Self::Other => 1,
        }
    }

    /// Only transport trouble is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&ChainError> for FailureKind {
    fn from(e: &ChainError) -> Self {
        match e {
            ChainError::Broken { .. } | ChainError::ProofCountMismatch { .. } => Self::ChainBroken,
            ChainError::NotOwner { .. } | ChainError::UnsupportedVersion(_) => Self::Other,
        }
    }
}

impl From<&VerificationError> for FailureKind {
    fn from(e: &VerificationError) -> Self {
        match e {
            VerificationError::CryptographicFailure(_) | VerificationError::NotIncluded(_) => {
                Self::CryptographicFailure
            }
            VerificationError::SourceStateMismatch { .. } => Self::SourceStateMismatch,
            VerificationError::TransactionMismatch { .. } => Self::TransactionMismatch,
        }
    }
}

impl From<&OracleError> for FailureKind {
    fn from(e: &OracleError) -> Self {
        match e {
            OracleError::Rejected(_) => Self::Rejected,
            OracleError::NetworkUnavailable(_) => Self::NetworkUnavailable,
        }
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("network unavailable (retry later): operation timed out after {0:?}")]
    Timeout(Duration),

    /// A package submission stopped part way.
    #[error("{cause} (stopped at hop {failed_at}, {committed} hop(s) committed)")]
    Submission {
        failed_at: usize,
        committed: usize,
        cause: Box<WalletError>,
    },

    #[error("package is addressed to {recipient}, not to this wallet ({ours})")]
    NotRecipient { recipient: Address, ours: Address },

    #[error("token has no pending package to receive")]
    NothingToReceive,

    #[error("token file: {0}")]
    TokenFile(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl WalletError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Chain(e) => e.into(),
            Self::Verification(e) => e.into(),
            Self::Oracle(e) => e.into(),
            Self::Timeout(_) => FailureKind::NetworkUnavailable,
            Self::Submission { cause, .. } => cause.kind(),
            Self::NotRecipient { .. }
            | Self::NothingToReceive
            | Self::TokenFile(_)
            | Self::Config(_)
            | Self::Other(_) => FailureKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenchain_chain::ChainLink;
    use tokenchain_types::TransactionHash;

    #[test]
    fn messages_start_with_kind_label() {
        let errors = vec![
            WalletError::Chain(ChainError::Broken {
                at: ChainLink::History(2),
                reason: "bad".into(),
            }),
            WalletError::Verification(VerificationError::CryptographicFailure("sig".into())),
            WalletError::Verification(VerificationError::TransactionMismatch {
                expected: TransactionHash::new([1u8; 32]),
                recorded: TransactionHash::new([2u8; 32]),
            }),
            WalletError::Oracle(OracleError::NetworkUnavailable("refused".into())),
            WalletError::Oracle(OracleError::Rejected(
                tokenchain_oracle::RejectReason::LeafConflict,
            )),
            WalletError::Timeout(Duration::from_secs(3)),
        ];
        for e in errors {
            let message = e.to_string();
            assert!(
                message.starts_with(e.kind().label()),
                "{message:?} does not start with {:?}",
                e.kind().label()
            );
        }
    }

    #[test]
    fn network_and_double_spend_are_distinguishable() {
        let network = WalletError::Oracle(OracleError::NetworkUnavailable("x".into()));
        let spent = WalletError::Verification(VerificationError::TransactionMismatch {
            expected: TransactionHash::new([1u8; 32]),
            recorded: TransactionHash::new([2u8; 32]),
        });
        assert_ne!(network.kind(), spent.kind());
        assert_ne!(network.kind().exit_code(), spent.kind().exit_code());
        assert!(network.kind().is_retryable());
        assert!(!spent.kind().is_retryable());
    }

    #[test]
    fn submission_failure_inherits_cause_kind() {
        let e = WalletError::Submission {
            failed_at: 2,
            committed: 2,
            cause: Box::new(WalletError::Oracle(OracleError::NetworkUnavailable("x".into()))),
        };
        assert_eq!(e.kind(), FailureKind::NetworkUnavailable);
        assert!(e.to_string().starts_with("network unavailable"));
    }
}
