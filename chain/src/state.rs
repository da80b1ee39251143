//! Token state: which token, who owns it and what data it carries.

use serde::{Deserialize, Serialize};
use tokenchain_crypto::{blake2b_256, CanonicalHasher};
use tokenchain_types::{encoding, Address, DataHash, StateHash, TokenId};

use crate::predicate::Predicate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Binds the state to one token, so two tokens held by the same
    /// predicate never share a request id.
    pub token_id: TokenId,
    pub predicate: Predicate,
    #[serde(default, with = "encoding::opt_bytes")]
    pub data: Option<Vec<u8>>,
}

impl State {
    pub fn new(token_id: TokenId, predicate: Predicate, data: Option<Vec<u8>>) -> Self {
        Self {
            token_id,
            predicate,
            data,
        }
    }

    /// Changes if and only if the token, the predicate or the data changes.
    pub fn hash(&self) -> StateHash {
        let mut hasher = CanonicalHasher::new("tokenchain/state");
        hasher
            .field(self.token_id.as_bytes())
            .field(&self.predicate.reference())
            .opt_field(self.data.as_deref());
        StateHash::new(hasher.finish())
    }

    pub fn address(&self) -> Address {
        self.predicate.address()
    }

    /// Commitment a sender places in a transition for this state's data.
    pub fn data_hash(&self) -> Option<DataHash> {
        self.data.as_deref().map(hash_data)
    }
}

/// Hash a recipient data payload for a transition commitment.
pub fn hash_data(data: &[u8]) -> DataHash {
    DataHash::new(blake2b_256(data))
}
