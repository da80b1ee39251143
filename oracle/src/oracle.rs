use std::future::Future;

use serde::{Deserialize, Serialize};
use tokenchain_chain::{Authenticator, Genesis, Proof, Transition};
use tokenchain_types::{RequestId, TransactionHash};

use crate::error::OracleError;

/// What gets recorded in the ledger for one state spend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub request_id: RequestId,
    pub transaction_hash: TransactionHash,
    pub authenticator: Authenticator,
}

impl Commitment {
    pub fn for_transition(transition: &Transition) -> Self {
        Self {
            request_id: transition.request_id(),
            transaction_hash: transition.transaction_hash(),
            authenticator: transition.authenticator.clone(),
        }
    }

    pub fn for_genesis(genesis: &Genesis) -> Self {
        Self {
            request_id: genesis.request_id(),
            transaction_hash: genesis.transaction_hash(),
            authenticator: genesis.authenticator.clone(),
        }
    }
}

/// A successful submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accepted {
    /// First time this commitment was recorded.
    Recorded,
    /// The identical commitment was already recorded.
    AlreadyRecorded,
}

pub trait ProofOracle: Send + Sync {
    /// Record a commitment. Resubmitting an identical commitment succeeds.
    fn submit(
        &self,
        commitment: &Commitment,
    ) -> impl Future<Output = Result<Accepted, OracleError>> + Send;

    /// Fetch the inclusion or exclusion proof for `request_id`.
    fn get_proof(
        &self,
        request_id: &RequestId,
    ) -> impl Future<Output = Result<Proof, OracleError>> + Send;
}
