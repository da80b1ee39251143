//! Retrying oracle calls on transport failure.

use std::future::Future;

use tokenchain_chain::Proof;
use tokenchain_oracle::{OracleError, ProofOracle};
use tokenchain_types::RequestId;
use tokenchain_verification::{VerificationError, Verified};
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::WalletError;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. Only `NetworkUnavailable` is retried.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, OracleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(what, attempt = attempt + 1, ?delay, error = %e, "oracle call failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Poll `request_id` until `check` confirms inclusion.
///
/// `check` returns `Unspent` while the ledger still answers exclusion.
/// Any verification error ends the poll. Running out of polls while the
/// state is still excluded is reported as `NetworkUnavailable`.
pub async fn await_inclusion<O, C>(
    oracle: &O,
    network: &RetryPolicy,
    poll: &RetryPolicy,
    request_id: &RequestId,
    mut check: C,
) -> Result<Proof, WalletError>
where
    O: ProofOracle,
    C: FnMut(&Proof) -> Result<Verified, VerificationError>,
{
    for attempt in 0..poll.max_attempts {
        let proof = with_retries(network, "get_proof", || oracle.get_proof(request_id)).await?;
        match check(&proof)? {
            Verified::Confirmed => return Ok(proof),
            Verified::Unspent => {
                let delay = poll.backoff(attempt);
                debug!(%request_id, attempt, ?delay, "not yet included");
                tokio::time::sleep(delay).await;
            }
        }
    }
    Err(OracleError::NetworkUnavailable(format!(
        "request {request_id} not yet included after {} polls",
        poll.max_attempts
    ))
    .into())
}
