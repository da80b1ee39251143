//! JSON-RPC over HTTP oracle client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokenchain_chain::Proof;
use tokenchain_types::RequestId;
use tracing::{debug, warn};

use crate::error::OracleError;
use crate::oracle::{Accepted, Commitment, ProofOracle};
use crate::wire::{
    classify_proof, classify_submit, GetInclusionProofParams, GetInclusionProofResult, RpcRequest,
    RpcResponse, SubmitCommitmentParams, SubmitCommitmentResult, GET_INCLUSION_PROOF,
    SUBMIT_COMMITMENT,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a proof oracle speaking JSON-RPC 2.0.
///
/// Every transport problem (refused connection, timeout, non-2xx status,
/// undecodable body) surfaces as [`OracleError::NetworkUnavailable`].
pub struct HttpOracleClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpOracleClient {
    pub fn new(url: impl Into<String>) -> Result<Self, OracleError> {
        Self::with_timeouts(url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| OracleError::NetworkUnavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a JSON-RPC request and decode the response envelope.
    async fn rpc_call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<RpcResponse<R>, OracleError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, url = %self.url, "oracle request");

        let response = self
            .http
            .post(&self.url)
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    format!("request failed: {e}")
                };
                warn!(method, id, %reason, "oracle unreachable");
                OracleError::NetworkUnavailable(reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(method, id, %status, "oracle returned non-success status");
            return Err(OracleError::NetworkUnavailable(format!(
                "oracle returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::NetworkUnavailable(format!("malformed response: {e}")))
    }
}

impl ProofOracle for HttpOracleClient {
    async fn submit(&self, commitment: &Commitment) -> Result<Accepted, OracleError> {
        let params = SubmitCommitmentParams {
            request_id: commitment.request_id,
            transaction_hash: commitment.transaction_hash,
            authenticator: commitment.authenticator.clone(),
        };
        let response: RpcResponse<SubmitCommitmentResult> =
            self.rpc_call(SUBMIT_COMMITMENT, params).await?;
        classify_submit(response)
    }

    async fn get_proof(&self, request_id: &RequestId) -> Result<Proof, OracleError> {
        let params = GetInclusionProofParams {
            request_id: *request_id,
        };
        let response: RpcResponse<GetInclusionProofResult> =
            self.rpc_call(GET_INCLUSION_PROOF, params).await?;
        classify_proof(response)
    }
}
