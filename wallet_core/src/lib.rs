//! Wallet core: the pieces a tokenchain client is built from.
//!
//! - [`SubmissionEngine`] commits offline packages, resumably and in order.
//! - [`OwnershipResolver`] maps ledger answers to a [`Verdict`].
//! - [`Wallet`] drives mint, send, receive and verify on top of both.
//! - [`load_token`] and [`save_token`] handle token files.

pub mod config;
pub mod error;
pub mod resolver;
pub mod retry;
pub mod submission;
pub mod token_file;
pub mod wallet;

pub use config::{ClientConfig, RetryPolicy};
pub use error::{FailureKind, WalletError};
pub use resolver::{OwnershipResolver, Resolution, Verdict};
pub use submission::{CommittedHop, SubmissionEngine, SubmissionResult};
pub use token_file::{load_token, save_token};
pub use wallet::{MintOutcome, MintParams, ReceiveOutcome, SendRequest, Wallet};
