//! JSON-RPC 2.0 wire format and the mapping from responses to outcomes.

use serde::{Deserialize, Serialize};
use tokenchain_chain::{Authenticator, Proof};
use tokenchain_types::{RequestId, TransactionHash};

use crate::error::{OracleError, RejectReason};
use crate::oracle::Accepted;

pub const SUBMIT_COMMITMENT: &str = "submit_commitment";
pub const GET_INCLUSION_PROOF: &str = "get_inclusion_proof";

/// Error message the ledger uses for an immutable-leaf conflict.
pub const LEAF_CONFLICT_MESSAGE: &str = "leaf already has different value";

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_REQUEST_ID_EXISTS: &str = "REQUEST_ID_EXISTS";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P> RpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<R> {
    pub result: Option<R>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCommitmentParams {
    pub request_id: RequestId,
    pub transaction_hash: TransactionHash,
    pub authenticator: Authenticator,
}

#[derive(Debug, Deserialize)]
pub struct SubmitCommitmentResult {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInclusionProofParams {
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInclusionProofResult {
    pub inclusion_proof: Proof,
}

/// Map a `submit_commitment` response to an outcome.
pub fn classify_submit(response: RpcResponse<SubmitCommitmentResult>) -> Result<Accepted, OracleError> {
    if let Some(error) = response.error {
        let reason = if error.message.contains(LEAF_CONFLICT_MESSAGE) {
            RejectReason::LeafConflict
        } else {
            RejectReason::Other(format!("{} (code {})", error.message, error.code))
        };
        return Err(OracleError::Rejected(reason));
    }
    match response.result {
        Some(result) if result.status == STATUS_SUCCESS => Ok(Accepted::Recorded),
        Some(result) if result.status == STATUS_REQUEST_ID_EXISTS => Ok(Accepted::AlreadyRecorded),
        Some(result) => Err(OracleError::Rejected(RejectReason::Other(result.status))),
        None => Err(OracleError::NetworkUnavailable(
            "submit_commitment response has neither result nor error".into(),
        )),
    }
}

/// Map a `get_inclusion_proof` response to a proof.
///
/// This call always answers with a proof shape; an error object here is an
/// anomaly, not an exclusion.
pub fn classify_proof(response: RpcResponse<GetInclusionProofResult>) -> Result<Proof, OracleError> {
    if let Some(error) = response.error {
        return Err(OracleError::NetworkUnavailable(format!(
            "get_inclusion_proof failed: {} (code {})",
            error.message, error.code
        )));
    }
    response
        .result
        .map(|r| r.inclusion_proof)
        .ok_or_else(|| {
            OracleError::NetworkUnavailable("get_inclusion_proof response has no result".into())
        })
}
