//! Address type with `tok_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// A tokenchain address, always prefixed with `tok_`.
///
/// Derived from a predicate reference via Blake2b hashing + base32 encoding
/// (see `tokenchain_crypto::derive_address`). This type only checks the
/// prefix; checksum validation lives next to the codec in the crypto crate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all tokenchain addresses.
    pub const PREFIX: &'static str = "tok_";

    /// Create an address from a raw string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if !s.starts_with(Self::PREFIX) || s.len() == Self::PREFIX.len() {
            return Err(TypesError::InvalidAddress(s));
        }
        Ok(Self(s))
    }

    /// Build an address from its encoded body (everything after the prefix).
    pub fn from_encoded(body: &str) -> Self {
        Self(format!("{}{}", Self::PREFIX, body))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_prefix() {
        assert!(Address::parse("brst_abc").is_err());
        assert!(Address::parse("tok_").is_err());
        assert_eq!(Address::parse("tok_abc").unwrap().as_str(), "tok_abc");
    }

    #[test]
    fn deserialize_validates_prefix() {
        let bad: Result<Address, _> = serde_json::from_str("\"nano_123\"");
        assert!(bad.is_err());
        let good: Address = serde_json::from_str("\"tok_123\"").unwrap();
        assert_eq!(good.to_string(), "tok_123");
    }
}
