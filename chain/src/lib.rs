//! Token chain model.
//!
//! A token is a genesis record followed by an append-only list of
//! confirmed transitions, each paired with the ledger's inclusion proof.
//! Transfers that have not reached the ledger yet travel as an
//! [`OfflinePackage`]: an ordered list of signed hops that can grow
//! several links long before the first submission.

pub mod authenticator;
pub mod error;
pub mod genesis;
pub mod package;
pub mod predicate;
pub mod proof;
pub mod state;
pub mod token;
pub mod transition;

pub use authenticator::Authenticator;
pub use error::{ChainError, ChainLink};
pub use genesis::{mint_source_state, minter_keypair, CoinEntry, Genesis, GenesisData};
pub use package::{append_offline, OfflinePackage, PackageHop};
pub use predicate::{Predicate, PredicateKind, ED25519};
pub use proof::{MerkleStep, MerkleTreePath, Proof, ProofShape, UnicityCertificate};
pub use state::State;
pub use token::{HistoryEntry, Token, TOKEN_FORMAT_VERSION};
pub use transition::{Transition, TransitionData, TransferRequest};
