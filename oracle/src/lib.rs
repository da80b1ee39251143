//! Proof oracle client.
//!
//! The oracle is the append-only ledger's front door. It answers two
//! questions: "record this commitment" and "what is recorded under this
//! request id". Transport trouble is reported as
//! [`OracleError::NetworkUnavailable`] and is never mistaken for an
//! exclusion proof.

pub mod client;
pub mod error;
pub mod oracle;
pub mod wire;

pub use client::HttpOracleClient;
pub use error::{OracleError, RejectReason};
pub use oracle::{Accepted, Commitment, ProofOracle};
