//! Ownership resolver: turns ledger answers into a verdict.

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use tokenchain_chain::{Proof, Token};
use tokenchain_oracle::{Commitment, ProofOracle};
use tokenchain_types::{RequestId, TransactionHash};
use tokenchain_verification::{
    CorrespondenceVerifier, Expectation, Observed, VerificationError, Verified,
};
use tracing::{debug, info};

use crate::config::RetryPolicy;
use crate::error::{FailureKind, WalletError};
use crate::retry::with_retries;

/// Ownership verdict for one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The ledger has not recorded the genesis yet.
    Pending,
    /// The current state is unspent and nothing has been handed off.
    Unspent,
    /// A package is attached but its first hop is not recorded yet.
    Transferred,
    /// The current state was consumed by a transition we recognise.
    Confirmed,
    /// The current state was consumed by a transition we never built.
    Outdated,
    /// No verdict could be reached.
    Error(FailureKind),
}

impl Verdict {
    /// Exit code for scripts; `OUTDATED` shares the double-spend code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pending | Self::Unspent | Self::Transferred | Self::Confirmed => 0,
            Self::Outdated => FailureKind::TransactionMismatch.exit_code(),
            Self::Error(kind) => kind.exit_code(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Unspent => write!(f, "UNSPENT"),
            Self::Transferred => write!(f, "TRANSFERRED"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Outdated => write!(f, "OUTDATED"),
            Self::Error(kind) => write!(f, "ERROR ({kind})"),
        }
    }
}

/// A verdict with the facts behind it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub verdict: Verdict,
    /// Request id of the current state, once the genesis is committed.
    pub request_id: Option<RequestId>,
    /// Transaction the ledger recorded for the current state, if any.
    pub recorded: Option<TransactionHash>,
    pub history_len: usize,
    pub package_len: usize,
    pub detail: Option<String>,
}

impl Resolution {
    fn new(token: &Token, verdict: Verdict) -> Self {
        Self {
            verdict,
            request_id: None,
            recorded: None,
            history_len: token.history.len(),
            package_len: token.pending_package.as_ref().map_or(0, |p| p.len()),
            detail: None,
        }
    }

    pub(crate) fn pending(token: &Token, detail: Option<String>) -> Self {
        Self {
            detail,
            ..Self::new(token, Verdict::Pending)
        }
    }

    /// The current state was consumed by `transaction_hash`, which this
    /// wallet just committed and verified.
    pub(crate) fn confirmed(token: &Token, transaction_hash: TransactionHash) -> Self {
        Self {
            request_id: Some(token.current_request_id()),
            recorded: Some(transaction_hash),
            ..Self::new(token, Verdict::Confirmed)
        }
    }

    pub(crate) fn error(token: &Token, error: &WalletError) -> Self {
        Self {
            detail: Some(error.to_string()),
            ..Self::new(token, Verdict::Error(error.kind()))
        }
    }
}

pub struct OwnershipResolver<O> {
    oracle: Arc<O>,
    verifier: CorrespondenceVerifier,
    retry: RetryPolicy,
}

impl<O: ProofOracle> OwnershipResolver<O> {
    pub fn new(oracle: Arc<O>, verifier: CorrespondenceVerifier, retry: RetryPolicy) -> Self {
        Self {
            oracle,
            verifier,
            retry,
        }
    }

    /// Resolve the ownership of `token`.
    ///
    /// `recognised` lists extra transaction hashes the caller built for the
    /// current state, in addition to the attached package's first hop.
    ///
    /// A token without a stored genesis proof is looked up on the ledger:
    /// a recorded genesis is resolved as if its proof were stored, an
    /// excluded one is `PENDING`.
    pub async fn resolve(&self, token: &Token, recognised: &[TransactionHash]) -> Resolution {
        if token.is_genesis_committed() {
            return self.resolve_committed(token, recognised).await;
        }
        match self.find_genesis_proof(token).await {
            Ok(Some(proof)) => match token.with_genesis_proof(proof) {
                Ok(committed) => {
                    let mut resolution = self.resolve_committed(&committed, recognised).await;
                    resolution.detail.get_or_insert_with(|| {
                        "genesis is recorded but its proof is not stored in this token yet".into()
                    });
                    resolution
                }
                Err(e) => Resolution::error(token, &WalletError::from(e)),
            },
            Ok(None) => {
                debug!(token_id = %token.token_id(), "genesis not recorded");
                Resolution::pending(token, None)
            }
            Err(e) => Resolution::error(token, &e),
        }
    }

    /// Ask the ledger for the genesis of `token`. `None` while it is
    /// excluded; a proof only when it records this exact genesis.
    pub async fn find_genesis_proof(&self, token: &Token) -> Result<Option<Proof>, WalletError> {
        let request_id = Commitment::for_genesis(&token.genesis).request_id;
        let proof = with_retries(&self.retry, "get_proof", || self.oracle.get_proof(&request_id)).await?;
        match self.verifier.verify_genesis(&token.genesis, &proof) {
            Ok(_) => Ok(Some(proof)),
            Err(VerificationError::NotIncluded(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_committed(&self, token: &Token, recognised: &[TransactionHash]) -> Resolution {
        if let Err(e) = self.verifier.verify_token_proofs(token) {
            return Resolution::error(token, &WalletError::from(e));
        }

        let request_id = token.current_request_id();
        let proof = match with_retries(&self.retry, "get_proof", || self.oracle.get_proof(&request_id)).await {
            Ok(proof) => proof,
            Err(e) => {
                let mut resolution = Resolution::error(token, &WalletError::from(e));
                resolution.request_id = Some(request_id);
                return resolution;
            }
        };

        let mut resolution = Resolution::new(token, Verdict::Unspent);
        resolution.request_id = Some(request_id);

        let first_hop = token.pending_package.as_ref().and_then(|p| p.first());
        let outcome = match first_hop {
            Some(hop) => self
                .verifier
                .verify(&hop.transition, &proof, Expectation::MayBeUnspent)
                .map(|verified| match verified {
                    Verified::Unspent => Observed::Unspent,
                    Verified::Confirmed => Observed::Spent {
                        transaction_hash: hop.transition.transaction_hash(),
                    },
                })
                .or_else(|e| match e {
                    VerificationError::TransactionMismatch { recorded, .. } => Ok(Observed::Spent {
                        transaction_hash: recorded,
                    }),
                    other => Err(other),
                }),
            None => self.verifier.verify_state(&request_id, &proof),
        };

        let mut known = token.recognised_spends();
        known.extend_from_slice(recognised);
        resolution.verdict = match outcome {
            Err(e) => {
                let e = WalletError::from(e);
                resolution.detail = Some(e.to_string());
                Verdict::Error(e.kind())
            }
            Ok(Observed::Unspent) if first_hop.is_some() => Verdict::Transferred,
            Ok(Observed::Unspent) => Verdict::Unspent,
            Ok(Observed::Spent { transaction_hash }) => {
                resolution.recorded = Some(transaction_hash);
                if known.contains(&transaction_hash) {
                    Verdict::Confirmed
                } else {
                    resolution.detail = Some(format!(
                        "current state was consumed by transaction {transaction_hash}, which this wallet did not create"
                    ));
                    Verdict::Outdated
                }
            }
        };

        info!(token_id = %token.token_id(), verdict = %resolution.verdict, "resolved");
        resolution
    }

    /// Resolve independent tokens concurrently, preserving input order.
    pub async fn resolve_all(&self, tokens: &[Token]) -> Vec<Resolution> {
        join_all(tokens.iter().map(|token| self.resolve(token, &[]))).await
    }
}
