//! Transition: a signed state change spending one state and naming the
//! recipient of the next.

use serde::{Deserialize, Serialize};
use tokenchain_crypto::CanonicalHasher;
use tokenchain_types::{encoding, Address, DataHash, KeyPair, PublicKey, RequestId, StateHash, TransactionHash};

use crate::authenticator::Authenticator;
use crate::state::State;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    pub source_state_hash: StateHash,
    pub recipient: Address,
    #[serde(with = "encoding::hex32")]
    pub salt: [u8; 32],
    /// Commitment to the recipient's state data.
    #[serde(default)]
    pub data_hash: Option<DataHash>,
    #[serde(default, with = "encoding::opt_bytes")]
    pub message: Option<Vec<u8>>,
}

impl TransitionData {
    pub fn transaction_hash(&self) -> TransactionHash {
        let mut hasher = CanonicalHasher::new("tokenchain/transition");
        hasher
            .field(self.source_state_hash.as_bytes())
            .field(self.recipient.as_str().as_bytes())
            .field(&self.salt)
            .opt_field(self.data_hash.as_ref().map(|h| &h.as_bytes()[..]))
            .opt_field(self.message.as_deref());
        TransactionHash::new(hasher.finish())
    }
}

/// What a sender specifies when handing a token to someone else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub recipient: Address,
    pub salt: [u8; 32],
    pub data_hash: Option<DataHash>,
    pub message: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub data: TransitionData,
    pub authenticator: Authenticator,
}

impl Transition {
    /// Sign a transfer of `source` as its owner.
    pub fn create(keys: &KeyPair, source: &State, request: TransferRequest) -> Self {
        let data = TransitionData {
            source_state_hash: source.hash(),
            recipient: request.recipient,
            salt: request.salt,
            data_hash: request.data_hash,
            message: request.message,
        };
        let authenticator = Authenticator::sign(keys, &data.transaction_hash(), data.source_state_hash);
        Self {
            data,
            authenticator,
        }
    }

    pub fn transaction_hash(&self) -> TransactionHash {
        self.data.transaction_hash()
    }

    pub fn signer(&self) -> &PublicKey {
        &self.authenticator.public_key
    }

    /// Request id recomputed from the signer key and the declared source state.
    pub fn request_id(&self) -> RequestId {
        tokenchain_crypto::derive_request_id(self.signer(), &self.data.source_state_hash)
    }

    pub fn source_state_hash(&self) -> &StateHash {
        &self.data.source_state_hash
    }

    pub fn recipient(&self) -> &Address {
        &self.data.recipient
    }

    /// Check the signature and that it was made by the owner of `source`.
    pub fn check_signed_by_owner(&self, source: &State) -> Result<(), String> {
        if self.authenticator.state_hash != self.data.source_state_hash {
            return Err("authenticator declares a different source state".into());
        }
        if self.authenticator.public_key != source.predicate.public_key {
            return Err("signer is not the owner of the source state".into());
        }
        if !self.authenticator.verify(&self.transaction_hash()) {
            return Err("invalid transition signature".into());
        }
        Ok(())
    }
}
