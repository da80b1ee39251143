//! Nullable proof oracle: an in-memory ledger with failure injection.

use std::collections::HashMap;
use std::sync::Mutex;

use tokenchain_chain::{Authenticator, MerkleStep, Proof};
use tokenchain_crypto::{blake2b_256, keypair_from_seed};
use tokenchain_oracle::{Accepted, Commitment, OracleError, ProofOracle, RejectReason};
use tokenchain_types::{KeyPair, PublicKey, RequestId, StateHash, TransactionHash};

/// Seed of the key that certifies every proof this oracle issues.
const CERTIFIER_SEED: [u8; 32] = [0x7Eu8; 32];

/// Seed of the key used when certificates are deliberately corrupted.
const FORGER_SEED: [u8; 32] = [0x0Fu8; 32];

#[derive(Default)]
struct Ledger {
    leaves: HashMap<RequestId, Commitment>,
    /// Polls left during which a fresh leaf is still reported as excluded.
    hidden_polls: HashMap<RequestId, u32>,
    submissions: HashMap<RequestId, usize>,
    proof_queries: usize,
    round: u64,
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    /// Go unavailable once this many more commitments have been recorded.
    offline_after: Option<usize>,
    inclusion_delay: u32,
    corrupt_certificates: bool,
    answer_for_wrong_state: bool,
}

/// A deterministic in-memory ledger.
///
/// First write wins per request id; an identical resubmission is accepted,
/// a different transaction for the same request id is a leaf conflict.
pub struct NullOracle {
    certifier: KeyPair,
    ledger: Mutex<Ledger>,
    faults: Mutex<Faults>,
}

impl NullOracle {
    pub fn new() -> Self {
        Self {
            certifier: keypair_from_seed(&CERTIFIER_SEED),
            ledger: Mutex::new(Ledger::default()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Key to configure as the trust root when verifying this oracle's proofs.
    pub fn trust_root(&self) -> PublicKey {
        self.certifier.public
    }

    /// Make every call fail with `NetworkUnavailable` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        let mut faults = self.faults.lock().unwrap();
        faults.unavailable = unavailable;
        if !unavailable {
            faults.offline_after = None;
        }
    }

    /// Go unavailable right after `n` more commitments are recorded.
    pub fn go_offline_after(&self, n: usize) {
        let mut faults = self.faults.lock().unwrap();
        faults.offline_after = Some(n);
        faults.unavailable = n == 0;
    }

    /// Report each newly recorded leaf as excluded for `polls` lookups.
    pub fn delay_inclusion(&self, polls: u32) {
        self.faults.lock().unwrap().inclusion_delay = polls;
    }

    /// Sign certificates with a key that is not the trust root.
    pub fn corrupt_certificates(&self, corrupt: bool) {
        self.faults.lock().unwrap().corrupt_certificates = corrupt;
    }

    /// Answer every lookup with an inclusion proof for some other state.
    pub fn answer_for_wrong_state(&self, wrong: bool) {
        self.faults.lock().unwrap().answer_for_wrong_state = wrong;
    }

    /// Number of `submit` calls that reached the ledger for `request_id`.
    pub fn submissions(&self, request_id: &RequestId) -> usize {
        self.ledger
            .lock()
            .unwrap()
            .submissions
            .get(request_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_submissions(&self) -> usize {
        self.ledger.lock().unwrap().submissions.values().sum()
    }

    pub fn proof_queries(&self) -> usize {
        self.ledger.lock().unwrap().proof_queries
    }

    /// Transaction recorded under `request_id`, if any.
    pub fn recorded(&self, request_id: &RequestId) -> Option<TransactionHash> {
        self.ledger
            .lock()
            .unwrap()
            .leaves
            .get(request_id)
            .map(|c| c.transaction_hash)
    }

    fn check_available(&self) -> Result<(), OracleError> {
        if self.faults.lock().unwrap().unavailable {
            return Err(OracleError::NetworkUnavailable(
                "null oracle is offline".into(),
            ));
        }
        Ok(())
    }

    fn issue(
        &self,
        request_id: &RequestId,
        leaf: Option<(Authenticator, TransactionHash)>,
        round: u64,
    ) -> Proof {
        let forger;
        let certifier = if self.faults.lock().unwrap().corrupt_certificates {
            forger = keypair_from_seed(&FORGER_SEED);
            &forger
        } else {
            &self.certifier
        };
        let steps = vec![MerkleStep {
            left: round % 2 == 0,
            sibling: blake2b_256(&round.to_le_bytes()),
        }];
        let (authenticator, transaction_hash) = leaf.unzip();
        Proof::issue(request_id, authenticator, transaction_hash, steps, round, certifier)
    }

    fn wrong_state_proof(&self, round: u64) -> Proof {
        let stranger = keypair_from_seed(&[0xABu8; 32]);
        let tx = TransactionHash::new(blake2b_256(&round.to_le_bytes()));
        let auth = Authenticator::sign(&stranger, &tx, StateHash::new([0xCDu8; 32]));
        let id = auth.request_id();
        self.issue(&id, Some((auth, tx)), round)
    }
}

impl Default for NullOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofOracle for NullOracle {
    async fn submit(&self, commitment: &Commitment) -> Result<Accepted, OracleError> {
        self.check_available()?;
        let auth = &commitment.authenticator;
        if auth.request_id() != commitment.request_id || !auth.verify(&commitment.transaction_hash) {
            return Err(OracleError::Rejected(RejectReason::Other(
                "AUTHENTICATOR_VERIFICATION_FAILED".into(),
            )));
        }

        let mut ledger = self.ledger.lock().unwrap();
        *ledger.submissions.entry(commitment.request_id).or_insert(0) += 1;

        if let Some(existing) = ledger.leaves.get(&commitment.request_id) {
            return if existing.transaction_hash == commitment.transaction_hash {
                Ok(Accepted::AlreadyRecorded)
            } else {
                Err(OracleError::Rejected(RejectReason::LeafConflict))
            };
        }

        ledger.round += 1;
        ledger
            .leaves
            .insert(commitment.request_id, commitment.clone());

        let mut faults = self.faults.lock().unwrap();
        if faults.inclusion_delay > 0 {
            ledger
                .hidden_polls
                .insert(commitment.request_id, faults.inclusion_delay);
        }
        if let Some(left) = faults.offline_after {
            let left = left.saturating_sub(1);
            faults.offline_after = Some(left);
            if left == 0 {
                faults.unavailable = true;
            }
        }
        Ok(Accepted::Recorded)
    }

    async fn get_proof(&self, request_id: &RequestId) -> Result<Proof, OracleError> {
        self.check_available()?;
        let (leaf, round) = {
            let mut ledger = self.ledger.lock().unwrap();
            ledger.proof_queries += 1;
            let round = ledger.round;
            let hidden = match ledger.hidden_polls.get_mut(request_id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            };
            let leaf = if hidden {
                None
            } else {
                ledger
                    .leaves
                    .get(request_id)
                    .map(|c| (c.authenticator.clone(), c.transaction_hash))
            };
            (leaf, round)
        };

        if self.faults.lock().unwrap().answer_for_wrong_state {
            return Ok(self.wrong_state_proof(round));
        }
        Ok(self.issue(request_id, leaf, round))
    }
}
