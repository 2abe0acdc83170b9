//! Ready-made backing for end-to-end tests
//!
//! [`TestBacking::new`] wires an in-memory store with a public and a restricted
//! account, a scripted vault holding the public key, and a static identity token
//! trusted by the public account. Every scenario connects out of the box; tests
//! break one piece at a time.

use crate::builders::ConfigBuilder;
use crate::mocks::{CountingConnector, ScriptedSecretStore, StaticTokenCredential};
use depthstore_core::config::defaults;
use depthstore_core::store::MemoryStore;
use depthstore_core::{ConnectionSelector, CredentialResolver, EndpointConfig, StoreProvisioner};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const PUBLIC_ACCOUNT: &str = "memory://public";
pub const PUBLIC_KEY: &str = "cHVibGljLWtleQ==";
pub const RESTRICTED_ACCOUNT: &str = "memory://restricted";
pub const RESTRICTED_KEY: &str = "cmVzdHJpY3RlZC1rZXk=";
pub const IDENTITY_TOKEN: &str = "platform-identity-token";
pub const VAULT_ADDRESS: &str = "file:///vaults/test.toml";

pub struct TestBacking {
    pub store: MemoryStore,
    pub vault: ScriptedSecretStore,
    pub identity: Arc<StaticTokenCredential>,
    pub connector: CountingConnector,
    pub config: ConfigBuilder,
}

impl Default for TestBacking {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBacking {
    pub fn new() -> Self {
        let store = MemoryStore::new()
            .with_account(PUBLIC_ACCOUNT, PUBLIC_KEY)
            .with_account(RESTRICTED_ACCOUNT, RESTRICTED_KEY);
        store.trust_identity_token(PUBLIC_ACCOUNT, IDENTITY_TOKEN);

        let vault =
            ScriptedSecretStore::new().with_secret(defaults::VAULT_SECRET_NAME, PUBLIC_KEY);
        let connector = CountingConnector::new(Arc::new(store.clone()));
        let config = ConfigBuilder::new()
            .simple_account(PUBLIC_ACCOUNT, PUBLIC_KEY)
            .network_protected_account(RESTRICTED_ACCOUNT, RESTRICTED_KEY)
            .vault(VAULT_ADDRESS);

        Self {
            store,
            vault,
            identity: StaticTokenCredential::new(IDENTITY_TOKEN),
            connector,
            config,
        }
    }

    /// Adjust the configuration the selector will see
    pub fn configure(mut self, adjust: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> Self {
        self.config = adjust(self.config);
        self
    }

    pub fn resolver(&self) -> CredentialResolver {
        CredentialResolver::new(Arc::new(self.vault.clone()), self.identity.identity())
    }

    pub fn provisioner(&self) -> StoreProvisioner {
        StoreProvisioner::new(Arc::new(self.connector.clone()))
    }

    pub fn selector(&self) -> ConnectionSelector {
        ConnectionSelector::new(
            self.resolver(),
            self.provisioner(),
            self.config.clone().build_shared(),
        )
    }

    /// Default endpoint on the public account
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig::new(
            PUBLIC_ACCOUNT,
            defaults::DATABASE_NAME,
            defaults::CONTAINER_NAME,
            defaults::PARTITION_KEY_PATH,
        )
    }
}

#[derive(Serialize)]
struct VaultDocument<'a> {
    trusted_tokens: Vec<&'a str>,
    secrets: BTreeMap<&'a str, &'a str>,
}

/// A vault file in a temporary directory, for the file-backed secret store
pub struct TempVault {
    dir: TempDir,
}

impl TempVault {
    pub fn new(secrets: &[(&str, &str)], trusted_tokens: &[&str]) -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let document = VaultDocument {
            trusted_tokens: trusted_tokens.to_vec(),
            secrets: secrets.iter().copied().collect(),
        };
        let content = toml::to_string(&document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(dir.path().join("vault.toml"), content)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("vault.toml")
    }

    /// `file://` address of the vault
    pub fn address(&self) -> String {
        format!("file://{}", self.path().display())
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
