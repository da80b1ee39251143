//! Authenticator: the owner's signature over a transaction, bound to the
//! state it spends.

use serde::{Deserialize, Serialize};
use tokenchain_crypto::{derive_request_id, sign_message, verify_signature};
use tokenchain_types::{KeyPair, PublicKey, RequestId, Signature, StateHash, TransactionHash};

use crate::predicate::ED25519;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticator {
    pub algorithm: String,
    pub public_key: PublicKey,
    pub signature: Signature,
    /// Declared source-state hash.
    pub state_hash: StateHash,
}

impl Authenticator {
    /// Sign `transaction_hash` as the owner of `state_hash`.
    pub fn sign(keys: &KeyPair, transaction_hash: &TransactionHash, state_hash: StateHash) -> Self {
        Self {
            algorithm: ED25519.to_string(),
            public_key: keys.public,
            signature: sign_message(transaction_hash.as_bytes(), &keys.private),
            state_hash,
        }
    }

    /// `hash(publicKey || declaredSourceStateHash)`.
    pub fn request_id(&self) -> RequestId {
        derive_request_id(&self.public_key, &self.state_hash)
    }

    pub fn verify(&self, transaction_hash: &TransactionHash) -> bool {
        self.algorithm == ED25519
            && verify_signature(transaction_hash.as_bytes(), &self.signature, &self.public_key)
    }
}
