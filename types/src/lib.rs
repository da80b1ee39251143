//! Fundamental types for tokenchain.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! 32-byte hashes (state, transaction, request id, token id), signing keys,
//! and the `tok_` address type.

pub mod address;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod keys;

pub use address::Address;
pub use error::TypesError;
pub use hash::{DataHash, RequestId, StateHash, TokenId, TokenType, TransactionHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
