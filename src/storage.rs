use crate::models::TokenPair;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const TOKEN_FILE: &str = "tokens.yaml";

/// Persists the access/refresh token pair between runs
#[derive(Debug)]
pub struct TokenStore {
    tokens: Option<TokenPair>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// Opens the token file in `config_dir`. A missing or unreadable file
    /// means "signed out".
    pub fn open(config_dir: &Path) -> Self {
        let path = config_dir.join(TOKEN_FILE);
        let tokens = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_yaml::from_str::<TokenPair>(&raw).ok());
        TokenStore {
            tokens,
            path: Some(path),
        }
    }

    /// A store that never touches disk
    pub fn in_memory(tokens: Option<TokenPair>) -> Self {
        TokenStore { tokens, path: None }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.refresh_token.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn save(&mut self, tokens: TokenPair) -> Result<()> {
        self.tokens = Some(tokens);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.tokens = None;
        match &self.path {
            Some(path) if path.exists() => {
                fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    fn persist(&self) -> Result<()> {
        let (Some(path), Some(tokens)) = (&self.path, &self.tokens) else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let content = serde_yaml::to_string(tokens)?;
        write_private(path, content.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Writes `content` readable by the owner only
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files left by older runs
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}
