//! Proof verification.
//!
//! Two layers: a [`CertificateVerifier`] confirms that a proof is certified
//! by a trust root and internally consistent, and the
//! [`CorrespondenceVerifier`] decides whether a certified proof belongs to
//! the transition under test. Exclusion proofs are a normal answer, never
//! an error, unless the caller requires inclusion.

pub mod certificate;
pub mod correspondence;
pub mod error;

pub use certificate::{CertificateVerifier, ProofStatus, TrustRootVerifier, TrustRoots};
pub use correspondence::{CorrespondenceVerifier, Expectation, Observed, Verified};
pub use error::VerificationError;
