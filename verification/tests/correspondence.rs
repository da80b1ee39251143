use std::sync::Arc;

use proptest::prelude::*;
use tokenchain_chain::{
    Authenticator, Genesis, GenesisData, Predicate, Proof, State, TransferRequest, Transition,
};
use tokenchain_crypto::keypair_from_seed;
use tokenchain_types::{KeyPair, RequestId, StateHash, TokenId, TokenType, TransactionHash};
use tokenchain_verification::{
    CorrespondenceVerifier, Expectation, Observed, TrustRootVerifier, TrustRoots, Verified,
    VerificationError,
};

fn root() -> KeyPair {
    keypair_from_seed(&[77u8; 32])
}

fn verifier() -> CorrespondenceVerifier {
    CorrespondenceVerifier::new(Arc::new(TrustRootVerifier::new(TrustRoots::new([
        root().public,
    ]))))
}

fn transition(salt: u8) -> Transition {
    let owner = keypair_from_seed(&[1u8; 32]);
    let state = State::new(TokenId::new([4u8; 32]), Predicate::unmasked(owner.public), None);
    Transition::create(
        &owner,
        &state,
        TransferRequest {
            recipient: Predicate::unmasked(keypair_from_seed(&[2u8; 32]).public).address(),
            salt: [salt; 32],
            data_hash: None,
            message: None,
        },
    )
}

fn included(auth: &Authenticator, tx: TransactionHash) -> Proof {
    Proof::issue(&auth.request_id(), Some(auth.clone()), Some(tx), vec![], 3, &root())
}

fn excluded(id: &RequestId) -> Proof {
    Proof::issue(id, None, None, vec![], 3, &root())
}

#[test]
fn exclusion_is_unspent_when_allowed() {
    let t = transition(1);
    let proof = excluded(&t.request_id());
    assert_eq!(
        verifier().verify(&t, &proof, Expectation::MayBeUnspent),
        Ok(Verified::Unspent)
    );
    assert_eq!(
        verifier().verify(&t, &proof, Expectation::MustBeIncluded),
        Err(VerificationError::NotIncluded(t.request_id()))
    );
}

#[test]
fn own_transaction_is_confirmed() {
    let t = transition(1);
    let proof = included(&t.authenticator, t.transaction_hash());
    assert_eq!(
        verifier().verify(&t, &proof, Expectation::MayBeUnspent),
        Ok(Verified::Confirmed)
    );
}

#[test]
fn competing_transaction_is_a_mismatch_not_a_crypto_failure() {
    let ours = transition(1);
    let theirs = transition(2);
    let proof = included(&theirs.authenticator, theirs.transaction_hash());
    assert_eq!(
        verifier().verify(&ours, &proof, Expectation::MayBeUnspent),
        Err(VerificationError::TransactionMismatch {
            expected: ours.transaction_hash(),
            recorded: theirs.transaction_hash(),
        })
    );
}

#[test]
fn answer_for_another_state_is_source_state_mismatch() {
    let ours = transition(1);
    let stranger = keypair_from_seed(&[9u8; 32]);
    let tx = TransactionHash::new([4u8; 32]);
    let auth = Authenticator::sign(&stranger, &tx, StateHash::new([8u8; 32]));
    let proof = included(&auth, tx);
    assert!(matches!(
        verifier().verify(&ours, &proof, Expectation::MayBeUnspent),
        Err(VerificationError::SourceStateMismatch { .. })
    ));
}

#[test]
fn forged_certificate_is_cryptographic_failure() {
    let t = transition(1);
    let forger = keypair_from_seed(&[66u8; 32]);
    let proof = Proof::issue(
        &t.request_id(),
        Some(t.authenticator.clone()),
        Some(t.transaction_hash()),
        vec![],
        1,
        &forger,
    );
    assert!(matches!(
        verifier().verify(&t, &proof, Expectation::MayBeUnspent),
        Err(VerificationError::CryptographicFailure(_))
    ));
}

#[test]
fn exclusion_certified_for_another_request_fails() {
    let t = transition(1);
    let proof = excluded(&RequestId::new([5u8; 32]));
    assert!(matches!(
        verifier().verify(&t, &proof, Expectation::MayBeUnspent),
        Err(VerificationError::CryptographicFailure(_))
    ));
}

#[test]
fn verify_state_reports_recorded_hash() {
    let t = transition(1);
    let proof = included(&t.authenticator, t.transaction_hash());
    assert_eq!(
        verifier().verify_state(&t.request_id(), &proof),
        Ok(Observed::Spent {
            transaction_hash: t.transaction_hash()
        })
    );
}

#[test]
fn genesis_proof_must_be_inclusion() {
    let owner = keypair_from_seed(&[1u8; 32]);
    let genesis = Genesis::create(GenesisData {
        token_id: TokenId::new([3u8; 32]),
        token_type: TokenType::new([4u8; 32]),
        token_data: None,
        coins: None,
        recipient: Predicate::unmasked(owner.public).address(),
        salt: [0u8; 32],
        data_hash: None,
        reason: None,
    });
    let proof = included(&genesis.authenticator, genesis.transaction_hash());
    assert_eq!(verifier().verify_genesis(&genesis, &proof), Ok(Verified::Confirmed));
    let proof = excluded(&genesis.request_id());
    assert!(matches!(
        verifier().verify_genesis(&genesis, &proof),
        Err(VerificationError::NotIncluded(_))
    ));
}

proptest! {
    #[test]
    fn any_other_recorded_transaction_is_mismatch(a in 0u8..=255, b in 0u8..=255) {
        prop_assume!(a != b);
        let ours = transition(a);
        let theirs = transition(b);
        let proof = included(&theirs.authenticator, theirs.transaction_hash());
        let is_mismatch = matches!(
            verifier().verify(&ours, &proof, Expectation::MayBeUnspent),
            Err(VerificationError::TransactionMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }
}
