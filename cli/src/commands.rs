//! Subcommands. Each loads what it needs, drives the wallet and prints a
//! short report on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Subcommand;
use tokenchain_crypto::{blake2b_256, generate_keypair, keypair_from_seed, random_bytes};
use tokenchain_oracle::HttpOracleClient;
use tokenchain_types::{encoding, Address, KeyPair, TokenType};
use tokenchain_wallet_core::{
    load_token, save_token, ClientConfig, FailureKind, MintParams, Resolution, SendRequest,
    Verdict, Wallet,
};

#[derive(Subcommand)]
pub enum Command {
    /// Print a receiving address for this wallet.
    Address {
        /// Use a fresh single-use nonce; keep it to receive later.
        #[arg(long)]
        masked: bool,
    },
    /// Mint a token and wait until its genesis is recorded. A token whose
    /// genesis is not confirmed in time is still written; finish it with
    /// `resume`.
    Mint {
        /// Hex-encoded 32-byte token type.
        #[arg(long)]
        token_type: String,
        /// Data carried by the initial state.
        #[arg(long)]
        data: Option<String>,
        /// Immutable token metadata.
        #[arg(long)]
        token_data: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Finish a pending mint: attach the genesis proof once it is recorded.
    Resume {
        #[arg(long)]
        token: PathBuf,
        /// Defaults to overwriting the input file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Append an offline hop handing the token to another address.
    Send {
        #[arg(long)]
        token: PathBuf,
        #[arg(long)]
        to: String,
        #[arg(long)]
        message: Option<String>,
        /// Data the recipient's state must carry.
        #[arg(long)]
        recipient_data: Option<String>,
        /// Nonce of the masked address this wallet received the token on.
        #[arg(long)]
        nonce: Option<String>,
        /// Data of the state this wallet received.
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Submit the attached package and take ownership.
    Receive {
        #[arg(long)]
        token: PathBuf,
        /// Nonce of the masked address the package was sent to.
        #[arg(long)]
        nonce: Option<String>,
        /// Data the received state carries.
        #[arg(long)]
        data: Option<String>,
        /// Defaults to overwriting the input file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Resolve the ownership of a token without changing it.
    Verify {
        #[arg(long)]
        token: PathBuf,
    },
}

pub async fn execute(command: Command, secret: Option<&str>, config: ClientConfig) -> anyhow::Result<u8> {
    match command {
        Command::Address { masked } => {
            let wallet = wallet(keys(secret)?, config)?;
            if masked {
                let nonce = random_bytes();
                println!("address: {}", wallet.address(Some(nonce)));
                println!("nonce:   {}", hex::encode(nonce));
            } else {
                println!("address: {}", wallet.address(None));
            }
            Ok(0)
        }
        Command::Mint {
            token_type,
            data,
            token_data,
            out,
        } => {
            let wallet = wallet(keys(secret)?, config)?;
            let token_type: TokenType = token_type.parse().context("invalid --token-type")?;
            let params = MintParams {
                data: data.map(String::into_bytes),
                token_data: token_data.map(String::into_bytes),
                ..MintParams::new(token_type)
            };
            let outcome = wallet.mint(params).await?;
            save_token(&outcome.token, &out)?;
            println!("token:   {}", outcome.token.token_id());
            report(&outcome.resolution);
            Ok(mint_exit_code(&outcome.resolution.verdict, &out))
        }
        Command::Resume { token, out } => {
            let wallet = wallet(keys(secret)?, config)?;
            let pending = load_token(&token)?;
            let outcome = wallet.resume_mint(&pending).await?;
            let out = out.as_deref().unwrap_or(token.as_path());
            save_token(&outcome.token, out)?;
            report(&outcome.resolution);
            Ok(mint_exit_code(&outcome.resolution.verdict, out))
        }
        Command::Send {
            token,
            to,
            message,
            recipient_data,
            nonce,
            data,
            out,
        } => {
            let wallet = wallet(keys(secret)?, config)?;
            let current = load_token(&token)?;
            let request = SendRequest {
                recipient: Address::parse(to).context("invalid --to address")?,
                recipient_data: recipient_data.map(String::into_bytes),
                message: message.map(String::into_bytes),
                source_nonce: parse_nonce(nonce.as_deref())?,
                source_data: data.map(String::into_bytes),
            };
            let sent = wallet.send(&current, request)?;
            save_token(&sent, &out)?;
            let hops = sent.pending_package.as_ref().map_or(0, |p| p.len());
            println!("package: {hops} hop(s) pending, hand {} to the recipient", out.display());
            Ok(0)
        }
        Command::Receive {
            token,
            nonce,
            data,
            out,
        } => {
            let wallet = wallet(keys(secret)?, config)?;
            let incoming = load_token(&token)?;
            let outcome = wallet
                .receive(
                    &incoming,
                    parse_nonce(nonce.as_deref())?,
                    data.map(String::into_bytes),
                )
                .await?;
            let out = out.as_deref().unwrap_or(token.as_path());
            save_token(&outcome.token, out)?;
            println!("owner:   {}", outcome.token.owner_address());
            report(&outcome.resolution);
            Ok(outcome.resolution.verdict.exit_code() as u8)
        }
        Command::Verify { token } => {
            // Read-only: any key will do when no secret is configured.
            let keys = match secret {
                Some(_) => keys(secret)?,
                None => generate_keypair(),
            };
            let wallet = wallet(keys, config)?;
            let current = load_token(&token)?;
            let resolution = wallet.verify(&current, &[]).await;
            report(&resolution);
            Ok(resolution.verdict.exit_code() as u8)
        }
    }
}

fn keys(secret: Option<&str>) -> anyhow::Result<KeyPair> {
    match secret {
        Some(secret) if !secret.is_empty() => Ok(keypair_from_seed(&blake2b_256(secret.as_bytes()))),
        _ => bail!("a wallet secret is required (--secret or TOKENCHAIN_SECRET)"),
    }
}

fn wallet(keys: KeyPair, config: ClientConfig) -> anyhow::Result<Wallet<HttpOracleClient>> {
    let oracle = HttpOracleClient::with_timeouts(
        config.oracle_url.clone(),
        config.request_timeout(),
        config.connect_timeout(),
    )?;
    Ok(Wallet::new(keys, Arc::new(oracle), config)?)
}

/// A mint left `PENDING` was saved but still needs the ledger: report it
/// with the retry-later code.
fn mint_exit_code(verdict: &Verdict, saved: &Path) -> u8 {
    if *verdict == Verdict::Pending {
        println!("genesis not confirmed yet; run `tokenchain resume --token {}`", saved.display());
        return FailureKind::NetworkUnavailable.exit_code() as u8;
    }
    verdict.exit_code() as u8
}

fn parse_nonce(nonce: Option<&str>) -> anyhow::Result<Option<[u8; 32]>> {
    nonce
        .map(|n| encoding::decode_fixed::<32>(n).context("invalid --nonce"))
        .transpose()
}

fn report(resolution: &Resolution) {
    println!("verdict: {}", resolution.verdict);
    if let Some(id) = &resolution.request_id {
        println!("request: {id}");
    }
    if let Some(tx) = &resolution.recorded {
        println!("spent by: {tx}");
    }
    println!(
        "history: {} transition(s), {} pending hop(s)",
        resolution.history_len, resolution.package_len
    );
    if let Some(detail) = &resolution.detail {
        println!("detail:  {detail}");
    }
}
