//! Offline transfer packages.
//!
//! A package is a list of signed hops that have not reached the ledger.
//! The first hop spends the token's confirmed current state; every later
//! hop spends the state created by the hop before it, so several owners
//! can pass the token along before anyone submits.

use serde::{Deserialize, Serialize};
use tokenchain_types::{Address, DataHash, KeyPair};

use crate::error::{ChainError, ChainLink};
use crate::predicate::Predicate;
use crate::state::State;
use crate::token::Token;
use crate::transition::{TransferRequest, Transition};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageHop {
    /// State consumed by this hop, as revealed by its owner.
    pub source_state: State,
    pub transition: Transition,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflinePackage {
    pub hops: Vec<PackageHop>,
}

impl OfflinePackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn first(&self) -> Option<&PackageHop> {
        self.hops.first()
    }

    /// Address the last hop hands the token to.
    pub fn terminal_recipient(&self) -> Option<&Address> {
        self.hops.last().map(|hop| hop.transition.recipient())
    }

    pub fn terminal_data_hash(&self) -> Option<&DataHash> {
        self.hops
            .last()
            .and_then(|hop| hop.transition.data.data_hash.as_ref())
    }

    /// Check that the hops chain from `origin` and from each other.
    pub fn check_chain(&self, origin: &State) -> Result<(), ChainError> {
        let Some(first) = self.hops.first() else {
            return Ok(());
        };
        if first.source_state.hash() != origin.hash() {
            return Err(ChainError::broken(
                ChainLink::PackageHop(0),
                "first hop does not spend the current state",
            ));
        }
        check_consumption(
            &first.source_state,
            &origin.address(),
            origin.data_hash().as_ref(),
            &first.transition,
            ChainLink::PackageHop(0),
        )?;
        for (i, pair) in self.hops.windows(2).enumerate() {
            let (prev, hop) = (&pair[0], &pair[1]);
            if hop.source_state.token_id != origin.token_id {
                return Err(ChainError::broken(
                    ChainLink::PackageHop(i + 1),
                    "hop spends a state of another token",
                ));
            }
            check_consumption(
                &hop.source_state,
                prev.transition.recipient(),
                prev.transition.data.data_hash.as_ref(),
                &hop.transition,
                ChainLink::PackageHop(i + 1),
            )?;
        }
        Ok(())
    }
}

/// Append a signed hop to the token's package (or start one).
///
/// The first hop always spends the token's current state. Later hops
/// spend the state created by the previous hop; its owner supplies that
/// state as `source` (an unmasked data-less state is assumed if `None`).
pub fn append_offline(
    token: &Token,
    keys: &KeyPair,
    source: Option<State>,
    request: TransferRequest,
) -> Result<OfflinePackage, ChainError> {
    let mut package = token.pending_package.clone().unwrap_or_default();
    let index = package.len();

    let (source, recipient, data_hash) = match package.hops.last() {
        None => (
            token.current_state.clone(),
            token.current_state.address(),
            token.current_state.data_hash(),
        ),
        Some(last) => (
            source.unwrap_or_else(|| {
                State::new(*token.token_id(), Predicate::unmasked(keys.public), None)
            }),
            last.transition.recipient().clone(),
            last.transition.data.data_hash,
        ),
    };

    if source.predicate.public_key != keys.public {
        return Err(ChainError::NotOwner {
            owner: source.address(),
        });
    }

    let transition = Transition::create(keys, &source, request);
    check_consumption(
        &source,
        &recipient,
        data_hash.as_ref(),
        &transition,
        ChainLink::PackageHop(index),
    )?;

    package.hops.push(PackageHop {
        source_state: source,
        transition,
    });
    Ok(package)
}

/// A state spent by `transition` must belong to `recipient`, carry data
/// matching `data_hash`, and be signed away by its owner.
pub(crate) fn check_consumption(
    source: &State,
    recipient: &Address,
    data_hash: Option<&DataHash>,
    transition: &Transition,
    at: ChainLink,
) -> Result<(), ChainError> {
    check_received(source, recipient, data_hash, at)?;
    if transition.data.source_state_hash != source.hash() {
        return Err(ChainError::broken(
            at,
            "transition source state hash does not match the consumed state",
        ));
    }
    transition
        .check_signed_by_owner(source)
        .map_err(|reason| ChainError::broken(at, reason))
}

/// `state` is what the previous link handed to `recipient`.
pub(crate) fn check_received(
    state: &State,
    recipient: &Address,
    data_hash: Option<&DataHash>,
    at: ChainLink,
) -> Result<(), ChainError> {
    if &state.address() != recipient {
        return Err(ChainError::broken(
            at,
            format!("state belongs to {} but was sent to {}", state.address(), recipient),
        ));
    }
    if state.data_hash().as_ref() != data_hash {
        return Err(ChainError::broken(at, "state data does not match the committed data hash"));
    }
    Ok(())
}
