//! Credential source implementations, one per strategy family

use super::{CredentialMaterial, Strategy};
use crate::config::{self, ConfigSource, defaults, keys};
use crate::identity::AmbientIdentity;
use crate::secrets::{SecretStore, SecretStoreError};
use crate::security::SecureString;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Produces credential material for one strategy
///
/// Nothing is cached: each call resolves afresh.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn resolve(&self, config: &dyn ConfigSource) -> Result<CredentialMaterial>;

    /// The strategy this source implements
    fn strategy(&self) -> Strategy;
}

/// Shared key read from local configuration
///
/// The network-restricted variant reads a different key but is otherwise
/// identical; reachability is a deployment concern.
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    strategy: Strategy,
    key: &'static str,
}

impl StaticKeySource {
    pub fn simple() -> Self {
        Self {
            strategy: Strategy::StaticKey,
            key: keys::SIMPLE_KEY,
        }
    }

    pub fn network_restricted() -> Self {
        Self {
            strategy: Strategy::NetworkRestrictedStaticKey,
            key: keys::NETWORK_PROTECTED_KEY,
        }
    }

    /// The configuration key this source reads
    pub fn config_key(&self) -> &'static str {
        self.key
    }
}

#[async_trait]
impl CredentialSource for StaticKeySource {
    async fn resolve(&self, config: &dyn ConfigSource) -> Result<CredentialMaterial> {
        let key = config::require(config, self.key)?;
        Ok(CredentialMaterial::SharedKey(SecureString::new(key)))
    }

    fn strategy(&self) -> Strategy {
        self.strategy
    }
}

/// Shared key fetched from a secret store with the ambient identity
pub struct VaultKeySource {
    store: Arc<dyn SecretStore>,
    identity: AmbientIdentity,
}

impl VaultKeySource {
    pub fn new(store: Arc<dyn SecretStore>, identity: AmbientIdentity) -> Self {
        Self { store, identity }
    }
}

#[async_trait]
impl CredentialSource for VaultKeySource {
    async fn resolve(&self, config: &dyn ConfigSource) -> Result<CredentialMaterial> {
        let address = config::require(config, keys::VAULT_ADDRESS)?;
        let secret_name = config::get_or(config, keys::VAULT_SECRET_NAME, defaults::VAULT_SECRET_NAME);

        log::info!(
            "Fetching secret {secret_name} from vault {address} via {}",
            self.store.name()
        );

        let secret = self
            .store
            .fetch_secret(&address, &secret_name, &self.identity)
            .await
            .map_err(|e| {
                log::warn!("Vault fetch of {secret_name} from {address} failed: {e}");
                let reason = match e {
                    SecretStoreError::NotFound => "secret does not exist".to_string(),
                    other => other.to_string(),
                };
                Error::secret_unavailable(&address, &secret_name, reason)
            })?;

        if secret.is_blank() {
            return Err(Error::secret_unavailable(
                &address,
                &secret_name,
                "vault returned an empty value",
            ));
        }

        Ok(CredentialMaterial::SharedKey(secret))
    }

    fn strategy(&self) -> Strategy {
        Strategy::VaultResolvedKey
    }
}

/// Hands out the ambient identity handle; performs no I/O
#[derive(Clone)]
pub struct AmbientIdentitySource {
    identity: AmbientIdentity,
}

impl AmbientIdentitySource {
    pub fn new(identity: AmbientIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl CredentialSource for AmbientIdentitySource {
    async fn resolve(&self, _config: &dyn ConfigSource) -> Result<CredentialMaterial> {
        Ok(CredentialMaterial::AmbientIdentity(self.identity.clone()))
    }

    fn strategy(&self) -> Strategy {
        Strategy::AmbientIdentity
    }
}
