//! tokenchain: command-line client for offline token transfers.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokenchain_utils::LogFormat;
use tokenchain_wallet_core::{ClientConfig, WalletError};

#[derive(Parser)]
#[command(name = "tokenchain", about = "Mint, hand over and reconcile tokens")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the proof oracle.
    #[arg(long, global = true, env = "TOKENCHAIN_ORACLE_URL")]
    oracle_url: Option<String>,

    /// Hex-encoded certificate key to trust (repeatable).
    #[arg(long = "trust-root", global = true, env = "TOKENCHAIN_TRUST_ROOTS", value_delimiter = ',')]
    trust_roots: Vec<String>,

    /// Log filter, e.g. "info" or "warn,tokenchain_wallet_core=debug".
    #[arg(long, global = true, env = "TOKENCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format: "human" or "json".
    #[arg(long, global = true, env = "TOKENCHAIN_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Wallet secret; the signing key is derived from it.
    #[arg(long, global = true, env = "TOKENCHAIN_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_toml_file(path)?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.oracle_url {
            config.oracle_url = url.clone();
        }
        config.trust_roots.extend(self.trust_roots.iter().cloned());
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = cli.client_config()?;
    tokenchain_utils::init_logging(config.log_format, &config.log_level)?;
    tracing::debug!(oracle_url = %config.oracle_url, trust_roots = config.trust_roots.len(), "configuration loaded");
    commands::execute(cli.command, cli.secret.as_deref(), config).await
}

/// Wallet failures carry their own exit code; anything else is 1.
fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<WalletError>()
        .map_or(1, |e| e.kind().exit_code() as u8)
}
