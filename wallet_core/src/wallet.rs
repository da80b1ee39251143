//! Wallet operations: mint, send, receive and verify.

use std::future::Future;
use std::sync::Arc;

use tokenchain_chain::{
    append_offline, CoinEntry, Genesis, GenesisData, Predicate, Proof, State, Token,
    TransferRequest,
};
use tokenchain_crypto::random_bytes;
use tokenchain_oracle::{Commitment, ProofOracle};
use tokenchain_types::{Address, KeyPair, PublicKey, TokenId, TokenType, TransactionHash};
use tokenchain_verification::{
    CorrespondenceVerifier, TrustRootVerifier, VerificationError, Verified,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{FailureKind, WalletError};
use crate::resolver::{OwnershipResolver, Resolution};
use crate::retry::{await_inclusion, with_retries};
use crate::submission::SubmissionEngine;

/// What to mint.
#[derive(Clone, Debug)]
pub struct MintParams {
    /// Random when `None`.
    pub token_id: Option<TokenId>,
    pub token_type: TokenType,
    pub token_data: Option<Vec<u8>>,
    pub coins: Option<Vec<CoinEntry>>,
    /// Data payload of the initial state.
    pub data: Option<Vec<u8>>,
    /// Receive on a masked predicate with this nonce.
    pub nonce: Option<[u8; 32]>,
    pub reason: Option<String>,
}

impl MintParams {
    pub fn new(token_type: TokenType) -> Self {
        Self {
            token_id: None,
            token_type,
            token_data: None,
            coins: None,
            data: None,
            nonce: None,
            reason: None,
        }
    }
}

/// One offline hop to append.
#[derive(Clone, Debug)]
pub struct SendRequest {
    pub recipient: Address,
    /// Data the recipient's state must carry.
    pub recipient_data: Option<Vec<u8>>,
    pub message: Option<Vec<u8>>,
    /// Nonce and data of the state this wallet received through the
    /// package's previous hop. Ignored for the first hop.
    pub source_nonce: Option<[u8; 32]>,
    pub source_data: Option<Vec<u8>>,
}

impl SendRequest {
    pub fn to(recipient: Address) -> Self {
        Self {
            recipient,
            recipient_data: None,
            message: None,
            source_nonce: None,
            source_data: None,
        }
    }
}

#[derive(Debug)]
pub struct MintOutcome {
    pub token: Token,
    pub resolution: Resolution,
}

#[derive(Debug)]
pub struct ReceiveOutcome {
    /// The token with the package applied, owned by this wallet.
    pub token: Token,
    /// Resolution of the received token's previous state, built from the
    /// proofs just verified.
    pub resolution: Resolution,
}

pub struct Wallet<O> {
    keys: KeyPair,
    oracle: Arc<O>,
    verifier: CorrespondenceVerifier,
    config: ClientConfig,
}

impl<O: ProofOracle> Wallet<O> {
    /// A wallet that trusts the certificate keys listed in `config`.
    pub fn new(keys: KeyPair, oracle: Arc<O>, config: ClientConfig) -> Result<Self, WalletError> {
        let roots = config.trust_roots()?;
        let verifier = CorrespondenceVerifier::new(Arc::new(TrustRootVerifier::new(roots)));
        Ok(Self::with_verifier(keys, oracle, verifier, config))
    }

    pub fn with_verifier(
        keys: KeyPair,
        oracle: Arc<O>,
        verifier: CorrespondenceVerifier,
        config: ClientConfig,
    ) -> Self {
        Self {
            keys,
            oracle,
            verifier,
            config,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Unmasked predicate, or a masked one when `nonce` is given.
    pub fn predicate(&self, nonce: Option<[u8; 32]>) -> Predicate {
        match nonce {
            Some(nonce) => Predicate::masked(self.keys.public, nonce),
            None => Predicate::unmasked(self.keys.public),
        }
    }

    pub fn address(&self, nonce: Option<[u8; 32]>) -> Address {
        self.predicate(nonce).address()
    }

    pub fn resolver(&self) -> OwnershipResolver<O> {
        OwnershipResolver::new(
            Arc::clone(&self.oracle),
            self.verifier.clone(),
            self.config.network_retry.clone(),
        )
    }

    pub fn submission_engine(&self) -> SubmissionEngine<O> {
        SubmissionEngine::new(
            Arc::clone(&self.oracle),
            self.verifier.clone(),
            self.config.network_retry.clone(),
            self.config.inclusion_poll.clone(),
        )
    }

    /// Mint a token owned by this wallet and wait until its genesis is
    /// recorded. The returned resolution is `UNSPENT` on success.
    ///
    /// When the ledger cannot confirm the genesis in time the token is still
    /// returned, without a genesis proof and with a `PENDING` resolution.
    /// Keep it and finish with [`Wallet::resume_mint`].
    pub async fn mint(&self, params: MintParams) -> Result<MintOutcome, WalletError> {
        let token_id = params
            .token_id
            .unwrap_or_else(|| TokenId::new(random_bytes()));
        let state = State::new(token_id, self.predicate(params.nonce), params.data);
        let genesis = Genesis::create(GenesisData {
            token_id,
            token_type: params.token_type,
            token_data: params.token_data,
            coins: params.coins,
            recipient: state.address(),
            salt: random_bytes(),
            data_hash: state.data_hash(),
            reason: params.reason,
        });
        self.commit_genesis(Token::mint(genesis, state)?).await
    }

    /// Drive a `PENDING` token to a recorded genesis. Safe to repeat: the
    /// ledger is asked first and the same genesis is resubmitted only while
    /// it is still excluded.
    pub async fn resume_mint(&self, token: &Token) -> Result<MintOutcome, WalletError> {
        if token.is_genesis_committed() {
            let resolution = self.verify(token, &[]).await;
            return Ok(MintOutcome {
                token: token.clone(),
                resolution,
            });
        }
        self.commit_genesis(token.clone()).await
    }

    async fn commit_genesis(&self, token: Token) -> Result<MintOutcome, WalletError> {
        match self.bounded(self.genesis_proof(&token)).await {
            Ok(proof) => {
                let token = token.with_genesis_proof(proof)?;
                let resolution = self.verify(&token, &[]).await;
                Ok(MintOutcome { token, resolution })
            }
            Err(e) if e.kind() == FailureKind::NetworkUnavailable => {
                warn!(token_id = %token.token_id(), error = %e, "genesis not confirmed yet, token kept as pending");
                let resolution = Resolution::pending(&token, Some(e.to_string()));
                Ok(MintOutcome { token, resolution })
            }
            Err(e) => Err(e),
        }
    }

    async fn genesis_proof(&self, token: &Token) -> Result<Proof, WalletError> {
        if let Some(proof) = self.resolver().find_genesis_proof(token).await? {
            debug!(token_id = %token.token_id(), "genesis already recorded");
            return Ok(proof);
        }

        let commitment = Commitment::for_genesis(&token.genesis);
        let network = &self.config.network_retry;
        let accepted = with_retries(network, "submit", || self.oracle.submit(&commitment)).await?;
        info!(token_id = %token.token_id(), ?accepted, "genesis submitted");

        await_inclusion(
            self.oracle.as_ref(),
            network,
            &self.config.inclusion_poll,
            &commitment.request_id,
            |proof| match self.verifier.verify_genesis(&token.genesis, proof) {
                Err(VerificationError::NotIncluded(_)) => Ok(Verified::Unspent),
                other => other,
            },
        )
        .await
    }

    /// Append an offline hop handing `token` to `request.recipient`.
    ///
    /// Nothing is sent to the oracle; the returned token carries the
    /// package and resolves as `TRANSFERRED`.
    pub fn send(&self, token: &Token, request: SendRequest) -> Result<Token, WalletError> {
        let source = token
            .has_pending_package()
            .then(|| {
                State::new(
                    *token.token_id(),
                    self.predicate(request.source_nonce),
                    request.source_data,
                )
            });
        let data_hash = request
            .recipient_data
            .as_deref()
            .map(tokenchain_chain::state::hash_data);
        let package = append_offline(
            token,
            &self.keys,
            source,
            TransferRequest {
                recipient: request.recipient,
                salt: random_bytes(),
                data_hash,
                message: request.message,
            },
        )?;
        info!(token_id = %token.token_id(), hops = package.len(), "offline hop appended");
        Ok(token.with_package(package)?)
    }

    /// Submit the package attached to `token` and take ownership of the
    /// state its last hop creates.
    pub async fn receive(
        &self,
        token: &Token,
        nonce: Option<[u8; 32]>,
        data: Option<Vec<u8>>,
    ) -> Result<ReceiveOutcome, WalletError> {
        self.bounded(self.receive_inner(token, nonce, data)).await
    }

    async fn receive_inner(
        &self,
        token: &Token,
        nonce: Option<[u8; 32]>,
        data: Option<Vec<u8>>,
    ) -> Result<ReceiveOutcome, WalletError> {
        let package = token
            .pending_package
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or(WalletError::NothingToReceive)?;
        let state = State::new(*token.token_id(), self.predicate(nonce), data);
        let ours = state.address();
        match package.terminal_recipient() {
            Some(recipient) if recipient == &ours => {}
            Some(recipient) => {
                return Err(WalletError::NotRecipient {
                    recipient: recipient.clone(),
                    ours,
                })
            }
            None => return Err(WalletError::NothingToReceive),
        }
        if package.terminal_data_hash() != state.data_hash().as_ref() {
            return Err(WalletError::Other(
                "received data does not match the data hash committed by the sender".into(),
            ));
        }
        self.verifier.verify_token_proofs(token)?;

        let proofs = self
            .submission_engine()
            .submit_all(token, package)
            .await?
            .into_result()?;
        // Every hop is committed and verified, so the spend of the previous
        // state is known without asking the ledger again.
        let spent_by = package.hops[0].transition.transaction_hash();
        let resolution = Resolution::confirmed(token, spent_by);
        let received = token.apply_package(package, proofs, state)?;
        info!(
            token_id = %token.token_id(),
            history = received.history.len(),
            verdict = %resolution.verdict,
            "package received"
        );
        Ok(ReceiveOutcome {
            token: received,
            resolution,
        })
    }

    /// Read-only ownership check. `recognised` lists transactions the
    /// caller built for the current state besides the attached package.
    pub async fn verify(&self, token: &Token, recognised: &[TransactionHash]) -> Resolution {
        let limit = self.config.operation_timeout();
        match tokio::time::timeout(limit, self.resolver().resolve(token, recognised)).await {
            Ok(resolution) => resolution,
            Err(_) => Resolution::error(token, &WalletError::Timeout(limit)),
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, WalletError>>,
    ) -> Result<T, WalletError> {
        let limit = self.config.operation_timeout();
        tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| WalletError::Timeout(limit))?
    }
}
