//! Delegated proof check.
//!
//! Confirms that a proof is internally consistent and certified by one of
//! the configured trust roots. It says nothing about which transition the
//! proof belongs to; that is the correspondence verifier's job.

use std::collections::HashSet;

use tokenchain_chain::{Proof, ProofShape};
use tokenchain_crypto::verify_signature;
use tokenchain_types::{encoding, PublicKey, RequestId, TypesError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofStatus {
    Included,
    Excluded,
    Invalid(String),
}

pub trait CertificateVerifier: Send + Sync {
    fn verify(&self, proof: &Proof, request_id: &RequestId) -> ProofStatus;
}

/// Public keys whose unicity certificates are accepted.
#[derive(Clone, Debug, Default)]
pub struct TrustRoots {
    keys: HashSet<PublicKey>,
}

impl TrustRoots {
    pub fn new(keys: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Parse hex-encoded keys as found in configuration files.
    pub fn from_hex<S: AsRef<str>>(keys: &[S]) -> Result<Self, TypesError> {
        keys.iter()
            .map(|k| encoding::decode_fixed::<32>(k.as_ref()).map(PublicKey))
            .collect::<Result<HashSet<_>, _>>()
            .map(|keys| Self { keys })
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub struct TrustRootVerifier {
    roots: TrustRoots,
}

impl TrustRootVerifier {
    pub fn new(roots: TrustRoots) -> Self {
        Self { roots }
    }
}

impl CertificateVerifier for TrustRootVerifier {
    fn verify(&self, proof: &Proof, request_id: &RequestId) -> ProofStatus {
        let shape = proof.shape();
        let (Some(leaf), Some(digest)) = (proof.leaf_digest(), proof.certified_digest(request_id))
        else {
            return ProofStatus::Invalid(
                "authenticator and transaction hash must be both present or both absent".into(),
            );
        };

        let certificate = &proof.unicity_certificate;
        if !self.roots.contains(&certificate.signer) {
            return ProofStatus::Invalid(format!(
                "certificate signer {} is not a trust root",
                certificate.signer
            ));
        }
        if !proof.merkle_tree_path.folds_to_root(request_id, &leaf) {
            return ProofStatus::Invalid("merkle path does not lead to the certified root".into());
        }
        if !verify_signature(&digest, &certificate.signature, &certificate.signer) {
            return ProofStatus::Invalid("unicity certificate signature is invalid".into());
        }

        match (shape, &proof.authenticator, &proof.transaction_hash) {
            (ProofShape::Inclusion, Some(auth), Some(tx)) => {
                if auth.verify(tx) {
                    ProofStatus::Included
                } else {
                    ProofStatus::Invalid("authenticator signature is invalid".into())
                }
            }
            _ => ProofStatus::Excluded,
        }
    }
}
