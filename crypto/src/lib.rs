//! Cryptographic primitives for tokenchain.
//!
//! - **Ed25519** for signing transitions and verifying authenticators
//! - **Blake2b-256** for state, transaction and request-id hashing
//! - Address derivation with `tok_` prefix and base32 encoding

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{decode_address, derive_address, validate_address};
pub use hash::{blake2b_256, blake2b_256_multi, derive_request_id, CanonicalHasher};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private, random_bytes};
pub use sign::{sign_message, verify_signature};
