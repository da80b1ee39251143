//! Genesis record: the mint transition that creates a token.
//!
//! The genesis is signed by a minter key derived from the token id and
//! spends a virtual "mint source state" that is also derived from the
//! token id. Its request id is therefore fixed per token id, so a token
//! id can be minted at most once and anyone can check whether it was.

use serde::{Deserialize, Serialize};
use tokenchain_crypto::{blake2b_256_multi, keypair_from_seed, CanonicalHasher};
use tokenchain_types::{
    encoding, Address, DataHash, KeyPair, RequestId, StateHash, TokenId, TokenType, TransactionHash,
};

use crate::authenticator::Authenticator;

const MINTER_DOMAIN: &[u8] = b"tokenchain/minter";
const MINT_STATE_DOMAIN: &[u8] = b"tokenchain/mint";

/// One fungible denomination carried by a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinEntry {
    pub coin_id: DataHash,
    pub amount: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisData {
    pub token_id: TokenId,
    pub token_type: TokenType,
    /// Immutable token metadata.
    #[serde(default, with = "encoding::opt_bytes")]
    pub token_data: Option<Vec<u8>>,
    #[serde(default)]
    pub coins: Option<Vec<CoinEntry>>,
    pub recipient: Address,
    #[serde(with = "encoding::hex32")]
    pub salt: [u8; 32],
    /// Commitment to the initial state's data payload.
    #[serde(default)]
    pub data_hash: Option<DataHash>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl GenesisData {
    /// Covers every field.
    pub fn transaction_hash(&self) -> TransactionHash {
        let mut hasher = CanonicalHasher::new("tokenchain/genesis");
        hasher
            .field(self.token_id.as_bytes())
            .field(self.token_type.as_bytes())
            .opt_field(self.token_data.as_deref());
        match &self.coins {
            Some(coins) => {
                let count = (coins.len() as u64).to_le_bytes();
                hasher.opt_field(Some(&count[..]));
                for coin in coins {
                    hasher.field(coin.coin_id.as_bytes()).u128(coin.amount);
                }
            }
            None => {
                hasher.opt_field(None);
            }
        }
        hasher
            .field(self.recipient.as_str().as_bytes())
            .field(&self.salt)
            .opt_field(self.data_hash.as_ref().map(|h| &h.as_bytes()[..]))
            .opt_field(self.reason.as_ref().map(|r| r.as_bytes()));
        TransactionHash::new(hasher.finish())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    pub data: GenesisData,
    pub authenticator: Authenticator,
}

impl Genesis {
    /// Sign `data` with the token's minter key.
    pub fn create(data: GenesisData) -> Self {
        let minter = minter_keypair(&data.token_id);
        let authenticator = Authenticator::sign(
            &minter,
            &data.transaction_hash(),
            mint_source_state(&data.token_id),
        );
        Self {
            data,
            authenticator,
        }
    }

    pub fn transaction_hash(&self) -> TransactionHash {
        self.data.transaction_hash()
    }

    pub fn request_id(&self) -> RequestId {
        self.authenticator.request_id()
    }

    /// Signed by the minter key over this genesis, spending the mint source state.
    pub fn verify_authenticator(&self) -> bool {
        self.authenticator.public_key == minter_keypair(&self.data.token_id).public
            && self.authenticator.state_hash == mint_source_state(&self.data.token_id)
            && self.authenticator.verify(&self.transaction_hash())
    }
}

/// Deterministic key that signs the genesis of `token_id`.
pub fn minter_keypair(token_id: &TokenId) -> KeyPair {
    keypair_from_seed(&blake2b_256_multi(&[MINTER_DOMAIN, token_id.as_bytes()]))
}

/// Virtual state consumed by the genesis of `token_id`.
pub fn mint_source_state(token_id: &TokenId) -> StateHash {
    StateHash::new(blake2b_256_multi(&[MINT_STATE_DOMAIN, token_id.as_bytes()]))
}
