//! Ownership predicates and the addresses they derive.

use serde::{Deserialize, Serialize};
use tokenchain_crypto::{derive_address, CanonicalHasher};
use tokenchain_types::{encoding, Address, PublicKey};

/// Signature scheme identifier carried by predicates and authenticators.
pub const ED25519: &str = "ed25519";

/// Unmasked predicates are reusable: the same key always yields the same
/// address. Masked predicates mix in a single-use nonce so every receipt
/// gets a fresh, unlinkable address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PredicateKind {
    Unmasked,
    Masked {
        #[serde(with = "encoding::hex32")]
        nonce: [u8; 32],
    },
}

/// Binds a public key (and optionally a nonce) to an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub kind: PredicateKind,
    pub algorithm: String,
    pub public_key: PublicKey,
}

impl Predicate {
    pub fn unmasked(public_key: PublicKey) -> Self {
        Self {
            kind: PredicateKind::Unmasked,
            algorithm: ED25519.to_string(),
            public_key,
        }
    }

    pub fn masked(public_key: PublicKey, nonce: [u8; 32]) -> Self {
        Self {
            kind: PredicateKind::Masked { nonce },
            algorithm: ED25519.to_string(),
            public_key,
        }
    }

    /// Hash committing to every predicate field; the address encodes it.
    pub fn reference(&self) -> [u8; 32] {
        let mut hasher = CanonicalHasher::new("tokenchain/predicate");
        match &self.kind {
            PredicateKind::Unmasked => hasher.field(b"unmasked").opt_field(None),
            PredicateKind::Masked { nonce } => hasher.field(b"masked").opt_field(Some(&nonce[..])),
        };
        hasher
            .field(self.algorithm.as_bytes())
            .field(self.public_key.as_bytes());
        hasher.finish()
    }

    pub fn address(&self) -> Address {
        derive_address(&self.reference())
    }

    pub fn is_masked(&self) -> bool {
        matches!(self.kind, PredicateKind::Masked { .. })
    }
}
