//! Matching ledger proofs against local transitions.
//!
//! A certified proof tells us what the ledger recorded for a request id.
//! This module decides what that means for a particular transition: our
//! own spend (confirmed), nothing yet (unspent), someone else's spend
//! (transaction mismatch), or an answer about the wrong state.

use std::sync::Arc;

use tokenchain_chain::{mint_source_state, minter_keypair, Genesis, Proof, Token, Transition};
use tokenchain_crypto::derive_request_id;
use tokenchain_types::{RequestId, TransactionHash};
use tracing::debug;

use crate::certificate::{CertificateVerifier, ProofStatus};
use crate::error::VerificationError;

/// What the caller is prepared to accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    /// An exclusion proof is a valid answer ("not yet spent").
    MayBeUnspent,
    /// Only an inclusion proof will do (stored history, genesis).
    MustBeIncluded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verified {
    Unspent,
    Confirmed,
}

/// Ledger answer for a state queried without a local candidate transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observed {
    Unspent,
    Spent { transaction_hash: TransactionHash },
}

#[derive(Clone)]
pub struct CorrespondenceVerifier {
    primitive: Arc<dyn CertificateVerifier>,
}

impl CorrespondenceVerifier {
    pub fn new(primitive: Arc<dyn CertificateVerifier>) -> Self {
        Self { primitive }
    }

    /// Check `proof` as the ledger's answer for the state `transition` spends.
    pub fn verify(
        &self,
        transition: &Transition,
        proof: &Proof,
        expectation: Expectation,
    ) -> Result<Verified, VerificationError> {
        self.check(
            &transition.request_id(),
            &transition.transaction_hash(),
            proof,
            expectation,
        )
    }

    /// Check the proof of the mint transaction.
    pub fn verify_genesis(&self, genesis: &Genesis, proof: &Proof) -> Result<Verified, VerificationError> {
        let token_id = &genesis.data.token_id;
        let request_id = derive_request_id(&minter_keypair(token_id).public, &mint_source_state(token_id));
        self.check(
            &request_id,
            &genesis.transaction_hash(),
            proof,
            Expectation::MustBeIncluded,
        )
    }

    /// Check every stored proof of a token: genesis and each history entry.
    pub fn verify_token_proofs(&self, token: &Token) -> Result<(), VerificationError> {
        if let Some(proof) = &token.genesis_proof {
            self.verify_genesis(&token.genesis, proof)?;
        }
        for entry in &token.history {
            self.verify(&entry.transition, &entry.proof, Expectation::MustBeIncluded)?;
        }
        Ok(())
    }

    /// Interpret the ledger's answer for `request_id` without a candidate
    /// transition. Certificate and request id are checked; the recorded
    /// transaction is reported, not judged.
    pub fn verify_state(&self, request_id: &RequestId, proof: &Proof) -> Result<Observed, VerificationError> {
        let answered = proof.implied_request_id().unwrap_or(*request_id);
        match self.primitive.verify(proof, &answered) {
            ProofStatus::Invalid(reason) => Err(VerificationError::CryptographicFailure(reason)),
            ProofStatus::Excluded => Ok(Observed::Unspent),
            ProofStatus::Included => {
                if &answered != request_id {
                    return Err(VerificationError::SourceStateMismatch {
                        expected: *request_id,
                        answered,
                    });
                }
                match proof.transaction_hash {
                    Some(transaction_hash) => Ok(Observed::Spent { transaction_hash }),
                    None => Err(VerificationError::CryptographicFailure(
                        "inclusion proof without transaction hash".into(),
                    )),
                }
            }
        }
    }

    fn check(
        &self,
        request_id: &RequestId,
        transaction_hash: &TransactionHash,
        proof: &Proof,
        expectation: Expectation,
    ) -> Result<Verified, VerificationError> {
        match self.verify_state(request_id, proof)? {
            Observed::Unspent => match expectation {
                Expectation::MayBeUnspent => Ok(Verified::Unspent),
                Expectation::MustBeIncluded => Err(VerificationError::NotIncluded(*request_id)),
            },
            Observed::Spent { transaction_hash: recorded } if &recorded == transaction_hash => {
                Ok(Verified::Confirmed)
            }
            Observed::Spent { transaction_hash: recorded } => {
                debug!(%request_id, %recorded, expected = %transaction_hash, "state consumed by another transition");
                Err(VerificationError::TransactionMismatch {
                    expected: *transaction_hash,
                    recorded,
                })
            }
        }
    }
}
