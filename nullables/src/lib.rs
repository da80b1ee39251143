//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano: external
//! dependencies sit behind traits, and this crate provides test-friendly
//! implementations that return deterministic values and can be steered
//! programmatically.
//!
//! Usage: swap `HttpOracleClient` for [`NullOracle`] in tests.

pub mod oracle;

pub use oracle::NullOracle;
