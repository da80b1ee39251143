//! 32-byte hash types.
//!
//! Each newtype wraps the same Blake2b-256 digest width; they are distinct
//! types so a state hash can never be passed where a transaction hash or a
//! request id is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::encoding;
use crate::TypesError;

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                encoding::decode_fixed::<32>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                encoding::serialize_fixed(&self.0, serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                encoding::deserialize_fixed::<D, 32>(deserializer).map(Self)
            }
        }
    };
}

hash_type!(
    /// Hash of a token state: predicate plus optional data payload.
    StateHash
);

hash_type!(
    /// Hash of a transition or genesis record; names the consumer of a state.
    TransactionHash
);

hash_type!(
    /// Ledger lookup key: `hash(publicKey || sourceStateHash)`.
    RequestId
);

hash_type!(
    /// Unique token identifier chosen at mint time.
    TokenId
);

hash_type!(
    /// Token class identifier.
    TokenType
);

hash_type!(
    /// Generic digest (data commitments, coin ids, Merkle roots).
    DataHash
);
