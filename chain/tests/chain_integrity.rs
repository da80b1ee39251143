use proptest::prelude::*;
use tokenchain_chain::{
    append_offline, ChainError, Genesis, GenesisData, Predicate, Proof, State, Token, TransferRequest,
};
use tokenchain_crypto::keypair_from_seed;
use tokenchain_types::{KeyPair, TokenId, TokenType};

fn certifier() -> KeyPair {
    keypair_from_seed(&[200u8; 32])
}

fn mint(owner: &KeyPair, id: u8) -> Token {
    let token_id = TokenId::new([id; 32]);
    let state = State::new(token_id, Predicate::unmasked(owner.public), None);
    let genesis = Genesis::create(GenesisData {
        token_id,
        token_type: TokenType::new([1u8; 32]),
        token_data: None,
        coins: None,
        recipient: state.address(),
        salt: [id; 32],
        data_hash: None,
        reason: None,
    });
    let token = Token::mint(genesis, state).unwrap();
    let auth = token.genesis.authenticator.clone();
    let proof = Proof::issue(
        &auth.request_id(),
        Some(auth),
        Some(token.genesis.transaction_hash()),
        vec![],
        0,
        &certifier(),
    );
    token.with_genesis_proof(proof).unwrap()
}

/// Walk the token through `owners`, committing each hop as it is made.
fn transfer_chain(owners: &[KeyPair], salts: &[u8]) -> Token {
    let mut token = mint(&owners[0], 7);
    for (i, salt) in salts.iter().enumerate() {
        let (from, to) = (&owners[i], &owners[i + 1]);
        let package = append_offline(
            &token,
            from,
            None,
            TransferRequest {
                recipient: Predicate::unmasked(to.public).address(),
                salt: [*salt; 32],
                data_hash: None,
                message: Some(vec![*salt]),
            },
        )
        .unwrap();
        let proofs = package
            .hops
            .iter()
            .map(|hop| {
                Proof::issue(
                    &hop.transition.request_id(),
                    Some(hop.transition.authenticator.clone()),
                    Some(hop.transition.transaction_hash()),
                    vec![],
                    i as u64 + 1,
                    &certifier(),
                )
            })
            .collect();
        let received = State::new(*token.token_id(), Predicate::unmasked(to.public), None);
        token = token.apply_package(&package, proofs, received).unwrap();
    }
    token
}

proptest! {
    #[test]
    fn folding_history_links_every_state(salts in prop::collection::vec(any::<u8>(), 1..6)) {
        let owners: Vec<KeyPair> = (0..=salts.len())
            .map(|i| keypair_from_seed(&[i as u8 + 30; 32]))
            .collect();
        let token = transfer_chain(&owners, &salts);

        prop_assert_eq!(token.history.len(), salts.len());
        prop_assert!(token.validate().is_ok());
        for pair in token.history.windows(2) {
            let next = &pair[1];
            prop_assert_eq!(next.source_state.address(), pair[0].transition.recipient().clone());
            prop_assert_eq!(next.transition.data.source_state_hash, next.source_state.hash());
        }
        prop_assert_eq!(
            token.owner_address(),
            Predicate::unmasked(owners[salts.len()].public).address()
        );
    }

    #[test]
    fn editing_any_history_entry_breaks_the_chain(
        salts in prop::collection::vec(any::<u8>(), 1..5),
        pick in any::<prop::sample::Index>(),
    ) {
        let owners: Vec<KeyPair> = (0..=salts.len())
            .map(|i| keypair_from_seed(&[i as u8 + 60; 32]))
            .collect();
        let token = transfer_chain(&owners, &salts);
        let i = pick.index(token.history.len());

        let mut history = token.history.clone();
        history[i].transition.data.salt[0] ^= 0xFF;
        let result = Token::load(
            token.genesis.clone(),
            token.genesis_proof.clone(),
            history,
            token.current_state.clone(),
            None,
        );
        let is_broken = matches!(result, Err(ChainError::Broken { .. }));
        prop_assert!(is_broken);
    }
}

#[test]
fn offline_hops_chain_without_commitment() {
    let owners: Vec<KeyPair> = (0..4).map(|i| keypair_from_seed(&[i + 90; 32])).collect();
    let mut token = mint(&owners[0], 3);
    for i in 0..3 {
        let package = append_offline(
            &token,
            &owners[i],
            None,
            TransferRequest {
                recipient: Predicate::unmasked(owners[i + 1].public).address(),
                salt: [i as u8; 32],
                data_hash: None,
                message: None,
            },
        )
        .unwrap();
        token = token.with_package(package).unwrap();
    }
    let package = token.pending_package.as_ref().unwrap();
    assert_eq!(package.len(), 3);
    assert!(token.history.is_empty());
    assert!(token.validate().is_ok());
}
