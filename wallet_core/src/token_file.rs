//! Token files: pretty JSON, replaced atomically on save.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tokenchain_chain::Token;
use tracing::debug;

use crate::error::WalletError;

/// Read a token file and check its chain.
pub fn load_token(path: &Path) -> Result<Token, WalletError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WalletError::TokenFile(format!("{}: {e}", path.display())))?;
    let token: Token = serde_json::from_str(&content)
        .map_err(|e| WalletError::TokenFile(format!("{}: {e}", path.display())))?;
    token.validate()?;
    Ok(token)
}

/// Write `token` to `path` through a temporary file in the same directory,
/// so readers see either the old file or the new one, never a partial write.
pub fn save_token(token: &Token, path: &Path) -> Result<(), WalletError> {
    let io_err = |e: std::io::Error| WalletError::TokenFile(format!("{}: {e}", path.display()));

    let json = serde_json::to_string_pretty(token)
        .map_err(|e| WalletError::TokenFile(e.to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(json.as_bytes()).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;
    debug!(path = %path.display(), token_id = %token.token_id(), "token saved");
    Ok(())
}
