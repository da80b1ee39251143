//! End-to-end reconciliation against the in-memory oracle:
//! mint → offline hops → submission → ownership verdicts.

use std::sync::Arc;
use std::time::Duration;

use tokenchain_chain::{Genesis, GenesisData, OfflinePackage, Predicate, State, Token};
use tokenchain_crypto::keypair_from_seed;
use tokenchain_nullables::NullOracle;
use tokenchain_oracle::{Commitment, ProofOracle};
use tokenchain_types::{TokenId, TokenType};
use tokenchain_wallet_core::{
    load_token, save_token, ClientConfig, FailureKind, MintParams, RetryPolicy, SendRequest,
    Verdict, Wallet, WalletError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(oracle: &NullOracle) -> ClientConfig {
    ClientConfig {
        trust_roots: vec![oracle.trust_root().to_string()],
        network_retry: RetryPolicy::new(2, Duration::ZERO, Duration::ZERO),
        inclusion_poll: RetryPolicy::new(5, Duration::ZERO, Duration::ZERO),
        operation_timeout_secs: 10,
        ..ClientConfig::default()
    }
}

fn wallet(oracle: &Arc<NullOracle>, seed: u8) -> Wallet<NullOracle> {
    Wallet::new(keypair_from_seed(&[seed; 32]), Arc::clone(oracle), config(oracle))
        .expect("valid config")
}

async fn mint(owner: &Wallet<NullOracle>) -> Token {
    owner
        .mint(MintParams::new(TokenType::new([9u8; 32])))
        .await
        .expect("mint")
        .token
}

/// A token whose genesis has not reached the ledger.
fn unsubmitted(owner: &Wallet<NullOracle>) -> Token {
    let token_id = TokenId::new([3u8; 32]);
    let state = State::new(token_id, owner.predicate(None), None);
    let genesis = Genesis::create(GenesisData {
        token_id,
        token_type: TokenType::new([9u8; 32]),
        token_data: None,
        coins: None,
        recipient: state.address(),
        salt: [1u8; 32],
        data_hash: None,
        reason: None,
    });
    Token::mint(genesis, state).unwrap()
}

fn send(from: &Wallet<NullOracle>, token: &Token, to: &Wallet<NullOracle>) -> Token {
    from.send(token, SendRequest::to(to.address(None)))
        .expect("send")
}

// ---------------------------------------------------------------------------
// Mint and basic verdicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn minted_token_is_unspent() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);

    let outcome = alice
        .mint(MintParams::new(TokenType::new([9u8; 32])))
        .await
        .unwrap();
    assert!(outcome.token.is_genesis_committed());
    assert_eq!(outcome.resolution.verdict, Verdict::Unspent);
    assert_eq!(outcome.token.owner_address(), alice.address(None));

    let again = alice.verify(&outcome.token, &[]).await;
    assert_eq!(again.verdict, Verdict::Unspent);
    assert_eq!(again.request_id, Some(outcome.token.current_request_id()));
    assert_eq!(again.recorded, None);
}

#[tokio::test]
async fn mint_waits_for_delayed_inclusion() {
    let oracle = Arc::new(NullOracle::new());
    oracle.delay_inclusion(3);
    let alice = wallet(&oracle, 1);
    let token = mint(&alice).await;
    assert!(token.is_genesis_committed());
}

#[tokio::test]
async fn excluded_genesis_is_pending_not_error() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let token = unsubmitted(&alice);

    let resolution = alice.verify(&token, &[]).await;
    assert_eq!(resolution.verdict, Verdict::Pending);
    assert_eq!(resolution.verdict.exit_code(), 0);
    assert_eq!(oracle.proof_queries(), 1, "the ledger is asked about the genesis");
    assert_eq!(oracle.total_submissions(), 0);
}

#[tokio::test]
async fn pending_token_with_recorded_genesis_is_unspent() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let token = unsubmitted(&alice);
    oracle
        .submit(&Commitment::for_genesis(&token.genesis))
        .await
        .unwrap();

    let resolution = alice.verify(&token, &[]).await;
    assert_eq!(resolution.verdict, Verdict::Unspent);
    assert_eq!(resolution.request_id, Some(token.current_request_id()));
    assert!(resolution.detail.is_some(), "proof not stored yet");

    let resumed = alice.resume_mint(&token).await.unwrap();
    assert!(resumed.token.is_genesis_committed());
    assert_eq!(resumed.resolution.verdict, Verdict::Unspent);
    assert_eq!(oracle.total_submissions(), 1, "a recorded genesis is not resubmitted");
}

#[tokio::test]
async fn network_failure_on_pending_token_is_error() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let token = unsubmitted(&alice);

    oracle.set_unavailable(true);
    assert_eq!(
        alice.verify(&token, &[]).await.verdict,
        Verdict::Error(FailureKind::NetworkUnavailable)
    );
}

#[tokio::test]
async fn slow_mint_leaves_a_resumable_token() {
    let oracle = Arc::new(NullOracle::new());
    oracle.delay_inclusion(8);
    let alice = wallet(&oracle, 1);

    let outcome = alice
        .mint(MintParams::new(TokenType::new([9u8; 32])))
        .await
        .unwrap();
    assert!(!outcome.token.is_genesis_committed());
    assert_eq!(outcome.resolution.verdict, Verdict::Pending);
    assert!(outcome
        .resolution
        .detail
        .as_deref()
        .unwrap()
        .starts_with("network unavailable"));
    let genesis_id = Commitment::for_genesis(&outcome.token.genesis).request_id;
    assert_eq!(
        oracle.recorded(&genesis_id),
        Some(outcome.token.genesis.transaction_hash())
    );

    // The pending token survives a save and finishes later.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pending.json");
    save_token(&outcome.token, &path).unwrap();
    let pending = load_token(&path).unwrap();

    let resumed = alice.resume_mint(&pending).await.unwrap();
    assert!(resumed.token.is_genesis_committed());
    assert_eq!(resumed.resolution.verdict, Verdict::Unspent);
    assert_eq!(resumed.token.token_id(), outcome.token.token_id());
    assert_eq!(
        oracle.recorded(&genesis_id),
        Some(outcome.token.genesis.transaction_hash())
    );

    // Already complete: nothing more is submitted.
    let submissions = oracle.total_submissions();
    let again = alice.resume_mint(&resumed.token).await.unwrap();
    assert_eq!(again.resolution.verdict, Verdict::Unspent);
    assert_eq!(oracle.total_submissions(), submissions);
}

// ---------------------------------------------------------------------------
// Transfer lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transferred_then_confirmed_for_both_parties() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);

    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);
    assert_eq!(alice.verify(&handed, &[]).await.verdict, Verdict::Transferred);

    let queries = oracle.proof_queries();
    let received = bob.receive(&handed, None, None).await.unwrap();
    assert_eq!(received.resolution.verdict, Verdict::Confirmed);
    assert_eq!(
        received.resolution.recorded,
        Some(handed.recognised_spends()[0])
    );
    assert_eq!(
        oracle.proof_queries() - queries,
        2,
        "one lookup and one inclusion poll, no extra resolve"
    );
    assert_eq!(received.token.history.len(), 1);
    assert!(received.token.pending_package.is_none());
    assert_eq!(received.token.owner_address(), bob.address(None));
    assert_eq!(bob.verify(&received.token, &[]).await.verdict, Verdict::Unspent);

    // The sender re-checks the copy it kept.
    let sender_view = alice.verify(&handed, &[]).await;
    assert_eq!(sender_view.verdict, Verdict::Confirmed);
    assert_eq!(
        sender_view.recorded,
        Some(handed.recognised_spends()[0])
    );
}

#[tokio::test]
async fn receive_on_masked_address() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let nonce = [42u8; 32];

    let token = mint(&alice).await;
    let handed = alice
        .send(
            &token,
            SendRequest {
                recipient_data: Some(b"invoice 17".to_vec()),
                ..SendRequest::to(bob.address(Some(nonce)))
            },
        )
        .unwrap();

    let wrong_data = bob.receive(&handed, Some(nonce), None).await.unwrap_err();
    assert!(matches!(wrong_data, WalletError::Other(_)));
    assert_eq!(oracle.total_submissions(), 1, "nothing sent for a bad receive");

    let received = bob
        .receive(&handed, Some(nonce), Some(b"invoice 17".to_vec()))
        .await
        .unwrap();
    assert!(received.token.current_state.predicate.is_masked());
    assert_eq!(bob.verify(&received.token, &[]).await.verdict, Verdict::Unspent);
}

#[tokio::test]
async fn receive_rejects_package_for_someone_else() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let carol = wallet(&oracle, 3);

    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);
    let err = carol.receive(&handed, None, None).await.unwrap_err();
    assert!(matches!(err, WalletError::NotRecipient { .. }));

    let err = bob.receive(&token, None, None).await.unwrap_err();
    assert!(matches!(err, WalletError::NothingToReceive));
}

#[tokio::test]
async fn multi_hop_offline_chain() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let carol = wallet(&oracle, 3);
    let dave = wallet(&oracle, 4);

    let token = mint(&alice).await;
    let token = send(&alice, &token, &bob);
    let token = send(&bob, &token, &carol);
    let token = send(&carol, &token, &dave);
    assert_eq!(token.pending_package.as_ref().map(|p| p.len()), Some(3));
    assert_eq!(oracle.total_submissions(), 1, "only the genesis reached the oracle");

    let received = dave.receive(&token, None, None).await.unwrap();
    assert_eq!(received.token.history.len(), 3);
    assert_eq!(received.token.owner_address(), dave.address(None));
    received.token.validate().unwrap();
}

// ---------------------------------------------------------------------------
// Idempotence and resumability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resubmission_is_idempotent() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);

    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);
    let package = handed.pending_package.clone().unwrap();
    let hop_id = package.hops[0].transition.request_id();

    let engine = bob.submission_engine();
    let first = engine.submit_all(&handed, &package).await.unwrap();
    assert!(first.is_complete());
    assert_eq!(first.newly_submitted(), 1);

    let second = engine.submit_all(&handed, &package).await.unwrap();
    assert!(second.is_complete());
    assert_eq!(second.committed.len(), 1);
    assert_eq!(second.newly_submitted(), 0);
    assert_eq!(oracle.submissions(&hop_id), 1);
    assert_eq!(
        oracle.recorded(&hop_id),
        Some(package.hops[0].transition.transaction_hash())
    );
}

#[tokio::test]
async fn interrupted_submission_resumes_without_duplicates() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let carol = wallet(&oracle, 3);
    let dave = wallet(&oracle, 4);

    let token = mint(&alice).await;
    let token = send(&alice, &token, &bob);
    let token = send(&bob, &token, &carol);
    let token = send(&carol, &token, &dave);
    let package = token.pending_package.clone().unwrap();
    let ids: Vec<_> = package.hops.iter().map(|h| h.transition.request_id()).collect();

    oracle.go_offline_after(2);
    let engine = dave.submission_engine();
    let first = engine.submit_all(&token, &package).await.unwrap();
    assert_eq!(first.failed_at, Some(1));
    assert_eq!(first.committed.len(), 1);
    assert_eq!(
        first.cause.as_ref().map(WalletError::kind),
        Some(FailureKind::NetworkUnavailable)
    );
    assert!(oracle.recorded(&ids[1]).is_some(), "hop 1 reached the ledger");
    assert!(oracle.recorded(&ids[2]).is_none());

    oracle.set_unavailable(false);
    let second = engine.submit_all(&token, &package).await.unwrap();
    assert!(second.is_complete());
    assert_eq!(second.committed.len(), 3);
    assert_eq!(second.newly_submitted(), 1);
    for id in &ids {
        assert_eq!(oracle.submissions(id), 1);
    }

    let received = dave.receive(&token, None, None).await.unwrap();
    assert_eq!(received.token.history.len(), 3);
    for id in &ids {
        assert_eq!(oracle.submissions(id), 1);
    }
}

#[tokio::test]
async fn empty_package_is_a_no_op() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let token = mint(&alice).await;
    let queries = oracle.proof_queries();

    let result = alice
        .submission_engine()
        .submit_all(&token, &OfflinePackage::new())
        .await
        .unwrap();
    assert!(result.is_complete());
    assert!(result.committed.is_empty());
    assert_eq!(oracle.proof_queries(), queries);
}

#[tokio::test]
async fn foreign_package_is_rejected_before_any_network_call() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);

    let first = mint(&alice).await;
    let second = mint(&alice).await;
    let handed = send(&alice, &first, &bob);
    let package = handed.pending_package.unwrap();
    let queries = oracle.proof_queries();

    let err = bob
        .submission_engine()
        .submit_all(&second, &package)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::ChainBroken);
    assert_eq!(oracle.proof_queries(), queries);
}

// ---------------------------------------------------------------------------
// Double spend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn double_spend_is_confirmed_for_winner_outdated_for_loser() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let carol = wallet(&oracle, 3);

    let token = mint(&alice).await;
    let to_bob = send(&alice, &token, &bob);
    let to_carol = send(&alice, &token, &carol);
    let spent_id = token.current_request_id();

    bob.receive(&to_bob, None, None).await.unwrap();

    assert_eq!(alice.verify(&to_bob, &[]).await.verdict, Verdict::Confirmed);
    let loser = alice.verify(&to_carol, &[]).await;
    assert_eq!(loser.verdict, Verdict::Outdated);
    assert_eq!(loser.verdict.exit_code(), 5);
    assert_eq!(alice.verify(&token, &[]).await.verdict, Verdict::Outdated);

    // Carol's submission stops at the first hop without submitting.
    let package = to_carol.pending_package.clone().unwrap();
    let result = carol
        .submission_engine()
        .submit_all(&to_carol, &package)
        .await
        .unwrap();
    assert_eq!(result.failed_at, Some(0));
    assert!(result.committed.is_empty());
    assert_eq!(
        result.cause.as_ref().map(WalletError::kind),
        Some(FailureKind::TransactionMismatch)
    );
    assert_eq!(oracle.submissions(&spent_id), 1);

    let err = carol.receive(&to_carol, None, None).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::TransactionMismatch);
    assert!(err.to_string().starts_with("transaction mismatch"));
}

// ---------------------------------------------------------------------------
// Errors never become verdicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn network_failure_is_error_not_unspent() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);

    oracle.set_unavailable(true);
    let resolution = alice.verify(&token, &[]).await;
    assert_eq!(resolution.verdict, Verdict::Error(FailureKind::NetworkUnavailable));
    assert!(resolution
        .detail
        .unwrap()
        .starts_with("network unavailable (retry later)"));

    let err = bob.receive(&handed, None, None).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NetworkUnavailable);
    assert!(matches!(err, WalletError::Submission { failed_at: 0, committed: 0, .. }));
}

#[tokio::test]
async fn answer_for_wrong_state_is_source_state_mismatch() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let token = mint(&alice).await;

    oracle.answer_for_wrong_state(true);
    let resolution = alice.verify(&token, &[]).await;
    assert_eq!(resolution.verdict, Verdict::Error(FailureKind::SourceStateMismatch));
}

#[tokio::test]
async fn forged_certificate_is_cryptographic_failure() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);

    oracle.corrupt_certificates(true);
    assert_eq!(
        alice.verify(&token, &[]).await.verdict,
        Verdict::Error(FailureKind::CryptographicFailure)
    );
    let err = bob.receive(&handed, None, None).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::CryptographicFailure);
    assert_eq!(oracle.total_submissions(), 1, "nothing submitted on a forged answer");
}

#[tokio::test]
async fn tampered_stored_proof_is_reported() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);
    let mut received = bob.receive(&handed, None, None).await.unwrap().token;

    received.history[0].proof.merkle_tree_path.root[0] ^= 1;
    assert_eq!(
        bob.verify(&received, &[]).await.verdict,
        Verdict::Error(FailureKind::CryptographicFailure)
    );
}

// ---------------------------------------------------------------------------
// Token files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_file_round_trip_and_tamper_detection() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);
    let token = mint(&alice).await;
    let handed = send(&alice, &token, &bob);
    let received = bob.receive(&handed, None, None).await.unwrap().token;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    save_token(&received, &path).unwrap();
    let loaded = load_token(&path).unwrap();
    assert_eq!(loaded, received);
    assert_eq!(bob.verify(&loaded, &[]).await.verdict, Verdict::Unspent);

    // Redirect the confirmed transfer to someone else.
    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let carol = Predicate::unmasked(keypair_from_seed(&[3u8; 32]).public).address();
    value["history"][0]["transition"]["data"]["recipient"] = serde_json::json!(carol.as_str());
    std::fs::write(&path, value.to_string()).unwrap();

    let err = load_token(&path).unwrap_err();
    assert_eq!(err.kind(), FailureKind::ChainBroken);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolve_all_keeps_input_order() {
    let oracle = Arc::new(NullOracle::new());
    let alice = wallet(&oracle, 1);
    let bob = wallet(&oracle, 2);

    let kept = mint(&alice).await;
    let given = send(&alice, &mint(&alice).await, &bob);

    let verdicts: Vec<_> = alice
        .resolver()
        .resolve_all(&[kept, given])
        .await
        .into_iter()
        .map(|r| r.verdict)
        .collect();
    assert_eq!(verdicts, vec![Verdict::Unspent, Verdict::Transferred]);
}
