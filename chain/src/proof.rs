//! Ledger proofs.
//!
//! The oracle answers every lookup with one of two proof shapes: an
//! inclusion proof (authenticator and transaction hash present, naming the
//! transaction that consumed the state) or an exclusion proof (both
//! absent, the state is still live). Both carry a Merkle path to a root
//! and a unicity certificate signed by a trust root over that root.

use serde::{Deserialize, Serialize};
use tokenchain_crypto::{blake2b_256_multi, sign_message, CanonicalHasher};
use tokenchain_types::{encoding, KeyPair, PublicKey, RequestId, Signature, TransactionHash};

use crate::authenticator::Authenticator;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleStep {
    /// Sibling sits to the left of the running digest.
    pub left: bool,
    #[serde(with = "encoding::hex32")]
    pub sibling: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleTreePath {
    #[serde(with = "encoding::hex32")]
    pub root: [u8; 32],
    pub steps: Vec<MerkleStep>,
}

impl MerkleTreePath {
    /// Build a path whose root is folded from `leaf` through `steps`.
    pub fn from_steps(request_id: &RequestId, leaf: &[u8; 32], steps: Vec<MerkleStep>) -> Self {
        let root = fold(request_id, leaf, &steps);
        Self { root, steps }
    }

    pub fn folds_to_root(&self, request_id: &RequestId, leaf: &[u8; 32]) -> bool {
        fold(request_id, leaf, &self.steps) == self.root
    }
}

fn fold(request_id: &RequestId, leaf: &[u8; 32], steps: &[MerkleStep]) -> [u8; 32] {
    let mut acc = blake2b_256_multi(&[request_id.as_bytes(), leaf]);
    for step in steps {
        acc = if step.left {
            blake2b_256_multi(&[&step.sibling, &acc])
        } else {
            blake2b_256_multi(&[&acc, &step.sibling])
        };
    }
    acc
}

/// Consensus attestation over a Merkle root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnicityCertificate {
    pub round: u64,
    pub signer: PublicKey,
    pub signature: Signature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProofShape {
    Inclusion,
    Exclusion,
    /// Exactly one of authenticator and transaction hash present.
    Malformed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(default)]
    pub authenticator: Option<Authenticator>,
    #[serde(default)]
    pub transaction_hash: Option<TransactionHash>,
    pub merkle_tree_path: MerkleTreePath,
    pub unicity_certificate: UnicityCertificate,
}

impl Proof {
    /// Issue a certified proof for `request_id`. Used by ledger
    /// implementations; an inclusion proof passes both `authenticator`
    /// and `transaction_hash`, an exclusion proof neither.
    pub fn issue(
        request_id: &RequestId,
        authenticator: Option<Authenticator>,
        transaction_hash: Option<TransactionHash>,
        steps: Vec<MerkleStep>,
        round: u64,
        certifier: &KeyPair,
    ) -> Self {
        let leaf = leaf_for(authenticator.as_ref(), transaction_hash.as_ref()).unwrap_or([0u8; 32]);
        let merkle_tree_path = MerkleTreePath::from_steps(request_id, &leaf, steps);
        let digest = certified_digest(&merkle_tree_path.root, request_id, &leaf);
        Self {
            authenticator,
            transaction_hash,
            merkle_tree_path,
            unicity_certificate: UnicityCertificate {
                round,
                signer: certifier.public,
                signature: sign_message(&digest, &certifier.private),
            },
        }
    }

    pub fn shape(&self) -> ProofShape {
        match (&self.authenticator, &self.transaction_hash) {
            (Some(_), Some(_)) => ProofShape::Inclusion,
            (None, None) => ProofShape::Exclusion,
            _ => ProofShape::Malformed,
        }
    }

    pub fn is_inclusion(&self) -> bool {
        self.shape() == ProofShape::Inclusion
    }

    pub fn is_exclusion(&self) -> bool {
        self.shape() == ProofShape::Exclusion
    }

    /// Request id implied by the authenticator, if this is an inclusion proof.
    pub fn implied_request_id(&self) -> Option<RequestId> {
        self.authenticator.as_ref().map(Authenticator::request_id)
    }

    /// Leaf value under the request id; `None` for malformed proofs.
    pub fn leaf_digest(&self) -> Option<[u8; 32]> {
        match self.shape() {
            ProofShape::Malformed => None,
            _ => Some(
                leaf_for(self.authenticator.as_ref(), self.transaction_hash.as_ref())
                    .unwrap_or([0u8; 32]),
            ),
        }
    }

    /// Message the unicity certificate signs for `request_id`.
    pub fn certified_digest(&self, request_id: &RequestId) -> Option<[u8; 32]> {
        self.leaf_digest()
            .map(|leaf| certified_digest(&self.merkle_tree_path.root, request_id, &leaf))
    }
}

fn leaf_for(
    authenticator: Option<&Authenticator>,
    transaction_hash: Option<&TransactionHash>,
) -> Option<[u8; 32]> {
    let (auth, tx) = (authenticator?, transaction_hash?);
    let mut hasher = CanonicalHasher::new("tokenchain/leaf");
    hasher
        .field(auth.algorithm.as_bytes())
        .field(auth.public_key.as_bytes())
        .field(auth.signature.as_bytes())
        .field(auth.state_hash.as_bytes())
        .field(tx.as_bytes());
    Some(hasher.finish())
}

fn certified_digest(root: &[u8; 32], request_id: &RequestId, leaf: &[u8; 32]) -> [u8; 32] {
    blake2b_256_multi(&[b"tokenchain/certificate", root, request_id.as_bytes(), leaf])
}
