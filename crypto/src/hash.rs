//! Blake2b hashing for states, transactions and request ids.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use tokenchain_types::{PublicKey, RequestId, StateHash};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Derive the ledger lookup key for a state: `blake2b(publicKey || stateHash)`.
pub fn derive_request_id(public_key: &PublicKey, state_hash: &StateHash) -> RequestId {
    RequestId::new(blake2b_256_multi(&[
        public_key.as_bytes(),
        state_hash.as_bytes(),
    ]))
}

/// Incremental hasher with an unambiguous field encoding.
///
/// Every field is length-prefixed (u64 little endian) and optional fields
/// carry a presence byte, so two different field sequences never produce
/// the same byte stream.
pub struct CanonicalHasher {
    inner: Blake2b256,
}

impl CanonicalHasher {
    /// Start a hash under a domain tag (e.g. `"tokenchain/state"`).
    pub fn new(domain: &str) -> Self {
        let mut hasher = Self {
            inner: Blake2b256::new(),
        };
        hasher.field(domain.as_bytes());
        hasher
    }

    pub fn field(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.update((bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self
    }

    pub fn opt_field(&mut self, bytes: Option<&[u8]>) -> &mut Self {
        match bytes {
            Some(b) => {
                self.inner.update([1u8]);
                self.field(b)
            }
            None => {
                self.inner.update([0u8]);
                self
            }
        }
    }

    pub fn u128(&mut self, value: u128) -> &mut Self {
        self.inner.update(value.to_le_bytes());
        self
    }

    pub fn finish(self) -> [u8; 32] {
        let result = self.inner.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }
}
