//! Secret store backed by a local TOML file
//!
//! The vault address is a `file://` URL pointing at a document like:
//!
//! ```toml
//! # optional; when present the caller's identity token must be listed
//! trusted_tokens = ["token-issued-to-the-web-app"]
//!
//! [secrets]
//! CosmosDbConnectionKey = "C2y6yDjf5..."
//! ```
//!
//! The file is read on every fetch.

use super::{SecretStore, SecretStoreError};
use crate::identity::{AmbientIdentity, VAULT_SCOPE};
use crate::security::SecureString;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

const SCHEME: &str = "file://";

#[derive(Deserialize)]
struct VaultFile {
    #[serde(default)]
    trusted_tokens: Vec<String>,

    #[serde(default)]
    secrets: HashMap<String, String>,
}

#[derive(Debug, Default, Clone)]
pub struct FileSecretStore;

impl FileSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Map a `file://` vault address onto a filesystem path
    pub fn vault_path(vault_address: &str) -> Result<PathBuf, SecretStoreError> {
        vault_address
            .strip_prefix(SCHEME)
            .filter(|rest| !rest.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                SecretStoreError::Unreachable(format!(
                    "unsupported vault address '{vault_address}', expected {SCHEME}<path>"
                ))
            })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn fetch_secret(
        &self,
        vault_address: &str,
        secret_name: &str,
        identity: &AmbientIdentity,
    ) -> Result<SecureString, SecretStoreError> {
        let path = Self::vault_path(vault_address)?;

        let token = identity
            .token(VAULT_SCOPE)
            .await
            .map_err(|e| SecretStoreError::Forbidden(e.to_string()))?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SecretStoreError::Unreachable(format!("{}: {e}", path.display())))?;
        let vault: VaultFile = toml::from_str(&content).map_err(|e| {
            SecretStoreError::Unreachable(format!("{} is not a vault file: {e}", path.display()))
        })?;

        if !vault.trusted_tokens.is_empty()
            && !vault
                .trusted_tokens
                .iter()
                .any(|trusted| SecureString::new(trusted.as_str()) == token.token)
        {
            return Err(SecretStoreError::Forbidden(format!(
                "identity '{}' is not trusted by this vault",
                identity.name()
            )));
        }

        vault
            .secrets
            .get(secret_name)
            .map(|value| SecureString::new(value.as_str()))
            .ok_or(SecretStoreError::NotFound)
    }

    fn name(&self) -> &str {
        "file"
    }
}
