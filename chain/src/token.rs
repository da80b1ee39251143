//! The token: genesis, confirmed history, current state and an optional
//! unsubmitted package.

use serde::{Deserialize, Serialize};
use tokenchain_types::{Address, DataHash, RequestId, TokenId, TransactionHash};

use crate::error::{ChainError, ChainLink};
use crate::genesis::{mint_source_state, Genesis};
use crate::package::{check_consumption, check_received, OfflinePackage};
use crate::proof::Proof;
use crate::state::State;
use crate::transition::Transition;

/// Token file format version written by this crate.
pub const TOKEN_FORMAT_VERSION: u32 = 1;

/// A confirmed transition: the state it consumed, the transition itself
/// and the ledger's inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub source_state: State,
    pub transition: Transition,
    pub proof: Proof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub version: u32,
    pub genesis: Genesis,
    /// `None` until the genesis has been committed.
    #[serde(default)]
    pub genesis_proof: Option<Proof>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub current_state: State,
    #[serde(default)]
    pub pending_package: Option<OfflinePackage>,
}

impl Token {
    /// A freshly minted token whose genesis has not been committed yet.
    pub fn mint(genesis: Genesis, initial_state: State) -> Result<Self, ChainError> {
        Self::load(genesis, None, Vec::new(), initial_state, None)
    }

    /// Assemble a token and check every link of its chain.
    pub fn load(
        genesis: Genesis,
        genesis_proof: Option<Proof>,
        history: Vec<HistoryEntry>,
        current_state: State,
        pending_package: Option<OfflinePackage>,
    ) -> Result<Self, ChainError> {
        let token = Self {
            version: TOKEN_FORMAT_VERSION,
            genesis,
            genesis_proof,
            history,
            current_state,
            pending_package,
        };
        token.validate()?;
        Ok(token)
    }

    /// Re-fold the chain from genesis and check every link.
    ///
    /// Proofs are only checked structurally here (inclusion shape, matching
    /// transaction and source state); certificate checks need trust roots
    /// and live in the verification crate.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.version != TOKEN_FORMAT_VERSION {
            return Err(ChainError::UnsupportedVersion(self.version));
        }
        if !self.genesis.verify_authenticator() {
            return Err(ChainError::broken(
                ChainLink::Genesis,
                "genesis is not signed by the minter key",
            ));
        }
        match &self.genesis_proof {
            Some(proof) => check_inclusion_shape(
                proof,
                &self.genesis.transaction_hash(),
                &mint_source_state(&self.genesis.data.token_id),
                ChainLink::Genesis,
            )?,
            None if !self.history.is_empty() => {
                return Err(ChainError::broken(
                    ChainLink::Genesis,
                    "history present but genesis was never committed",
                ));
            }
            None => {}
        }

        let token_id = &self.genesis.data.token_id;
        let mut recipient = &self.genesis.data.recipient;
        let mut data_hash = self.genesis.data.data_hash.as_ref();
        for (i, entry) in self.history.iter().enumerate() {
            let at = ChainLink::History(i);
            check_same_token(&entry.source_state, token_id, at)?;
            check_consumption(&entry.source_state, recipient, data_hash, &entry.transition, at)?;
            check_inclusion_shape(
                &entry.proof,
                &entry.transition.transaction_hash(),
                entry.transition.source_state_hash(),
                at,
            )?;
            recipient = entry.transition.recipient();
            data_hash = entry.transition.data.data_hash.as_ref();
        }
        check_same_token(&self.current_state, token_id, ChainLink::CurrentState)?;
        check_received(&self.current_state, recipient, data_hash, ChainLink::CurrentState)?;

        if let Some(package) = &self.pending_package {
            package.check_chain(&self.current_state)?;
        }
        Ok(())
    }

    pub fn token_id(&self) -> &TokenId {
        &self.genesis.data.token_id
    }

    pub fn owner_address(&self) -> Address {
        self.current_state.address()
    }

    /// Ledger key under which a spend of the current state would be recorded.
    pub fn current_request_id(&self) -> RequestId {
        tokenchain_crypto::derive_request_id(
            &self.current_state.predicate.public_key,
            &self.current_state.hash(),
        )
    }

    pub fn is_genesis_committed(&self) -> bool {
        self.genesis_proof.is_some()
    }

    pub fn has_pending_package(&self) -> bool {
        self.pending_package.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Transaction hashes this token's holder built for the current state.
    pub fn recognised_spends(&self) -> Vec<TransactionHash> {
        self.pending_package
            .iter()
            .flat_map(|p| p.first())
            .map(|hop| hop.transition.transaction_hash())
            .collect()
    }

    pub fn with_genesis_proof(&self, proof: Proof) -> Result<Self, ChainError> {
        check_inclusion_shape(
            &proof,
            &self.genesis.transaction_hash(),
            &mint_source_state(self.token_id()),
            ChainLink::Genesis,
        )?;
        Ok(Self {
            genesis_proof: Some(proof),
            ..self.clone()
        })
    }

    /// Attach (or replace) the unsubmitted package.
    pub fn with_package(&self, package: OfflinePackage) -> Result<Self, ChainError> {
        package.check_chain(&self.current_state)?;
        Ok(Self {
            pending_package: (!package.is_empty()).then_some(package),
            ..self.clone()
        })
    }

    /// Append every hop of a fully committed package to history.
    ///
    /// `proofs[i]` is the inclusion proof for `package.hops[i]` and
    /// `new_state` is the state the last hop created. Returns a new token;
    /// `self` is never modified, so a failure leaves the caller's copy intact.
    pub fn apply_package(
        &self,
        package: &OfflinePackage,
        proofs: Vec<Proof>,
        new_state: State,
    ) -> Result<Self, ChainError> {
        if proofs.len() != package.len() {
            return Err(ChainError::ProofCountMismatch {
                proofs: proofs.len(),
                hops: package.len(),
            });
        }
        package.check_chain(&self.current_state)?;

        let mut history = self.history.clone();
        for (i, (hop, proof)) in package.hops.iter().zip(proofs).enumerate() {
            check_inclusion_shape(
                &proof,
                &hop.transition.transaction_hash(),
                hop.transition.source_state_hash(),
                ChainLink::PackageHop(i),
            )?;
            history.push(HistoryEntry {
                source_state: hop.source_state.clone(),
                transition: hop.transition.clone(),
                proof,
            });
        }

        if let (Some(recipient), data_hash) = (package.terminal_recipient(), package.terminal_data_hash()) {
            check_same_token(&new_state, self.token_id(), ChainLink::CurrentState)?;
            check_received(&new_state, recipient, data_hash, ChainLink::CurrentState)?;
        } else if new_state != self.current_state {
            return Err(ChainError::broken(
                ChainLink::CurrentState,
                "empty package cannot change the current state",
            ));
        }

        Ok(Self {
            version: self.version,
            genesis: self.genesis.clone(),
            genesis_proof: self.genesis_proof.clone(),
            history,
            current_state: new_state,
            pending_package: None,
        })
    }

    /// Data hash committed for the current state by the last link.
    pub fn committed_data_hash(&self) -> Option<&DataHash> {
        match self.history.last() {
            Some(entry) => entry.transition.data.data_hash.as_ref(),
            None => self.genesis.data.data_hash.as_ref(),
        }
    }
}

fn check_same_token(state: &State, token_id: &TokenId, at: ChainLink) -> Result<(), ChainError> {
    if &state.token_id != token_id {
        return Err(ChainError::broken(at, "state belongs to another token"));
    }
    Ok(())
}

fn check_inclusion_shape(
    proof: &Proof,
    transaction_hash: &TransactionHash,
    source_state_hash: &tokenchain_types::StateHash,
    at: ChainLink,
) -> Result<(), ChainError> {
    let (Some(auth), Some(recorded)) = (&proof.authenticator, &proof.transaction_hash) else {
        return Err(ChainError::broken(at, "proof is not an inclusion proof"));
    };
    if recorded != transaction_hash {
        return Err(ChainError::broken(
            at,
            format!("proof records transaction {recorded}, expected {transaction_hash}"),
        ));
    }
    if &auth.state_hash != source_state_hash {
        return Err(ChainError::broken(at, "proof authenticator spends a different state"));
    }
    Ok(())
}
