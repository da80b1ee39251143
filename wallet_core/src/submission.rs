//! Chain submission engine.
//!
//! Commits the hops of an offline package in chain order. Each hop is
//! looked up before it is submitted, so re-running after a crash or a
//! network failure picks up where the last run stopped and never sends a
//! committed hop twice.

use std::sync::Arc;

use tokenchain_chain::{OfflinePackage, PackageHop, Proof, Token};
use tokenchain_oracle::{Commitment, OracleError, ProofOracle, RejectReason};
use tokenchain_types::RequestId;
use tokenchain_verification::{CorrespondenceVerifier, Expectation, Verified};
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::error::WalletError;
use crate::retry::{await_inclusion, with_retries};

/// One hop known to be recorded in the ledger.
#[derive(Clone, Debug)]
pub struct CommittedHop {
    pub index: usize,
    pub proof: Proof,
    /// `false` when the hop was already recorded before this run.
    pub newly_submitted: bool,
}

/// Outcome of [`SubmissionEngine::submit_all`].
///
/// `committed` is always the prefix of the package that is recorded. When
/// a hop fails, `failed_at` names it and `cause` says why; later hops are
/// not attempted.
#[derive(Debug, Default)]
pub struct SubmissionResult {
    pub committed: Vec<CommittedHop>,
    pub failed_at: Option<usize>,
    pub cause: Option<WalletError>,
}

impl SubmissionResult {
    pub fn is_complete(&self) -> bool {
        self.failed_at.is_none()
    }

    /// Hops this run actually sent to the oracle.
    pub fn newly_submitted(&self) -> usize {
        self.committed.iter().filter(|hop| hop.newly_submitted).count()
    }

    /// Inclusion proofs in hop order.
    pub fn proofs(&self) -> Vec<Proof> {
        self.committed.iter().map(|hop| hop.proof.clone()).collect()
    }

    /// Turn a partial result into an error carrying the failure cause.
    pub fn into_result(self) -> Result<Vec<Proof>, WalletError> {
        match (self.failed_at, self.cause) {
            (None, _) => Ok(self.committed.into_iter().map(|hop| hop.proof).collect()),
            (Some(failed_at), cause) => Err(WalletError::Submission {
                failed_at,
                committed: self.committed.len(),
                cause: Box::new(
                    cause.unwrap_or_else(|| WalletError::Other("submission stopped".into())),
                ),
            }),
        }
    }
}

pub struct SubmissionEngine<O> {
    oracle: Arc<O>,
    verifier: CorrespondenceVerifier,
    network_retry: RetryPolicy,
    inclusion_poll: RetryPolicy,
}

impl<O: ProofOracle> SubmissionEngine<O> {
    pub fn new(
        oracle: Arc<O>,
        verifier: CorrespondenceVerifier,
        network_retry: RetryPolicy,
        inclusion_poll: RetryPolicy,
    ) -> Self {
        Self {
            oracle,
            verifier,
            network_retry,
            inclusion_poll,
        }
    }

    /// Commit every hop of `package`, in order.
    ///
    /// Returns `Err` only when the package does not chain from the token's
    /// current state; nothing has been sent in that case. Every other
    /// failure is reported through [`SubmissionResult::failed_at`].
    pub async fn submit_all(
        &self,
        token: &Token,
        package: &OfflinePackage,
    ) -> Result<SubmissionResult, WalletError> {
        package.check_chain(&token.current_state)?;

        let mut result = SubmissionResult::default();
        for (index, hop) in package.hops.iter().enumerate() {
            match self.commit_hop(index, hop).await {
                Ok(committed) => result.committed.push(committed),
                Err(cause) => {
                    warn!(token_id = %token.token_id(), index, error = %cause, "submission stopped");
                    result.failed_at = Some(index);
                    result.cause = Some(cause);
                    return Ok(result);
                }
            }
        }
        info!(
            token_id = %token.token_id(),
            hops = package.len(),
            newly_submitted = result.newly_submitted(),
            "package committed"
        );
        Ok(result)
    }

    async fn commit_hop(&self, index: usize, hop: &PackageHop) -> Result<CommittedHop, WalletError> {
        let transition = &hop.transition;
        let request_id = transition.request_id();

        let proof = self.fetch(&request_id).await?;
        if self.verifier.verify(transition, &proof, Expectation::MayBeUnspent)? == Verified::Confirmed {
            debug!(index, %request_id, "hop already committed");
            return Ok(CommittedHop {
                index,
                proof,
                newly_submitted: false,
            });
        }

        let commitment = Commitment::for_transition(transition);
        match with_retries(&self.network_retry, "submit", || self.oracle.submit(&commitment)).await {
            Ok(accepted) => info!(index, %request_id, ?accepted, "hop submitted"),
            Err(OracleError::Rejected(RejectReason::LeafConflict)) => {
                // Someone else won the race; look up what they recorded.
                let proof = self.fetch(&request_id).await?;
                return match self.verifier.verify(transition, &proof, Expectation::MayBeUnspent)? {
                    Verified::Confirmed => Ok(CommittedHop {
                        index,
                        proof,
                        newly_submitted: false,
                    }),
                    Verified::Unspent => Err(OracleError::Rejected(RejectReason::LeafConflict).into()),
                };
            }
            Err(e) => return Err(e.into()),
        }

        let proof = await_inclusion(
            self.oracle.as_ref(),
            &self.network_retry,
            &self.inclusion_poll,
            &request_id,
            |proof| self.verifier.verify(transition, proof, Expectation::MayBeUnspent),
        )
        .await?;
        Ok(CommittedHop {
            index,
            proof,
            newly_submitted: true,
        })
    }

    async fn fetch(&self, request_id: &RequestId) -> Result<Proof, OracleError> {
        with_retries(&self.network_retry, "get_proof", || self.oracle.get_proof(request_id)).await
    }
}
