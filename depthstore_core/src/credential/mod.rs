//! Credential resolution
//!
//! One [`CredentialSource`] capability with a variant per [`Strategy`]. The
//! [`CredentialResolver`] owns the collaborators the variants need (the secret
//! store and the ambient identity) and dispatches on the requested strategy.

pub mod material;
pub mod source;
pub mod strategy;

use crate::Result;
use crate::config::ConfigSource;
use crate::identity::AmbientIdentity;
use crate::secrets::SecretStore;
use std::sync::Arc;

pub use material::CredentialMaterial;
pub use source::{AmbientIdentitySource, CredentialSource, StaticKeySource, VaultKeySource};
pub use strategy::Strategy;

/// Resolves credential material for any strategy
#[derive(Clone)]
pub struct CredentialResolver {
    secret_store: Arc<dyn SecretStore>,
    identity: AmbientIdentity,
}

impl CredentialResolver {
    pub fn new(secret_store: Arc<dyn SecretStore>, identity: AmbientIdentity) -> Self {
        Self {
            secret_store,
            identity,
        }
    }

    /// The source implementing `strategy`
    pub fn source_for(&self, strategy: Strategy) -> Box<dyn CredentialSource> {
        match strategy {
            Strategy::StaticKey => Box::new(StaticKeySource::simple()),
            Strategy::NetworkRestrictedStaticKey => Box::new(StaticKeySource::network_restricted()),
            Strategy::VaultResolvedKey => Box::new(VaultKeySource::new(
                self.secret_store.clone(),
                self.identity.clone(),
            )),
            Strategy::AmbientIdentity => Box::new(AmbientIdentitySource::new(self.identity.clone())),
        }
    }

    pub async fn resolve(
        &self,
        strategy: Strategy,
        config: &dyn ConfigSource,
    ) -> Result<CredentialMaterial> {
        log::debug!("Resolving credentials for strategy {strategy}");
        self.source_for(strategy).resolve(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::config::keys;
    use crate::secrets::SecretStoreError;
    use crate::security::SecureString;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedVault {
        reply: fn() -> std::result::Result<SecureString, SecretStoreError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecretStore for CannedVault {
        async fn fetch_secret(
            &self,
            _vault_address: &str,
            _secret_name: &str,
            _identity: &AmbientIdentity,
        ) -> std::result::Result<SecureString, SecretStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn resolver(
        reply: fn() -> std::result::Result<SecureString, SecretStoreError>,
    ) -> (CredentialResolver, Arc<CannedVault>) {
        let vault = Arc::new(CannedVault {
            reply,
            calls: AtomicUsize::new(0),
        });
        (
            CredentialResolver::new(vault.clone(), AmbientIdentity::from_environment()),
            vault,
        )
    }

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_static_key_reads_simple_key() {
        let (resolver, _) = resolver(|| Ok(SecureString::new("unused")));
        let cfg = config(&[(keys::SIMPLE_KEY, "simple=="), (keys::NETWORK_PROTECTED_KEY, "np==")]);

        match resolver.resolve(Strategy::StaticKey, &cfg).await.unwrap() {
            CredentialMaterial::SharedKey(key) => assert_eq!(key.expose_secret(), "simple=="),
            other => panic!("unexpected material {other:?}"),
        }
        match resolver
            .resolve(Strategy::NetworkRestrictedStaticKey, &cfg)
            .await
            .unwrap()
        {
            CredentialMaterial::SharedKey(key) => assert_eq!(key.expose_secret(), "np=="),
            other => panic!("unexpected material {other:?}"),
        }
    }

    #[test]
    fn test_static_sources_read_distinct_keys() {
        assert_eq!(StaticKeySource::simple().config_key(), keys::SIMPLE_KEY);
        assert_eq!(
            StaticKeySource::network_restricted().config_key(),
            keys::NETWORK_PROTECTED_KEY
        );
    }

    #[tokio::test]
    async fn test_static_key_missing_is_configuration_missing() {
        let (resolver, vault) = resolver(|| Ok(SecureString::new("unused")));
        let err = resolver
            .resolve(Strategy::StaticKey, &config(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing { ref key } if key == keys::SIMPLE_KEY));
        assert_eq!(vault.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_vault_key_resolves_shared_key() {
        let (resolver, vault) = resolver(|| Ok(SecureString::new("from-vault")));
        let cfg = config(&[(keys::VAULT_ADDRESS, "file:///vault.toml")]);
        match resolver.resolve(Strategy::VaultResolvedKey, &cfg).await.unwrap() {
            CredentialMaterial::SharedKey(key) => assert_eq!(key.expose_secret(), "from-vault"),
            other => panic!("unexpected material {other:?}"),
        }
        assert_eq!(vault.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_vault_is_not_cached_between_calls() {
        let (resolver, vault) = resolver(|| Ok(SecureString::new("k")));
        let cfg = config(&[(keys::VAULT_ADDRESS, "file:///vault.toml")]);
        resolver.resolve(Strategy::VaultResolvedKey, &cfg).await.unwrap();
        resolver.resolve(Strategy::VaultResolvedKey, &cfg).await.unwrap();
        assert_eq!(vault.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_vault_failures_become_secret_unavailable() {
        let cfg = config(&[(keys::VAULT_ADDRESS, "file:///vault.toml")]);

        let (r, _) = resolver(|| Err(SecretStoreError::Unreachable("refused".into())));
        let err = r.resolve(Strategy::VaultResolvedKey, &cfg).await.unwrap_err();
        assert!(matches!(err, Error::SecretUnavailable { .. }));

        let (r, _) = resolver(|| Err(SecretStoreError::NotFound));
        let err = r.resolve(Strategy::VaultResolvedKey, &cfg).await.unwrap_err();
        assert!(matches!(err, Error::SecretUnavailable { ref secret_name, .. } if secret_name == "CosmosDbConnectionKey"));

        let (r, _) = resolver(|| Ok(SecureString::new("   ")));
        let err = r.resolve(Strategy::VaultResolvedKey, &cfg).await.unwrap_err();
        assert!(matches!(err, Error::SecretUnavailable { ref reason, .. } if reason.contains("empty")));
    }

    #[tokio::test]
    async fn test_vault_address_missing_skips_fetch() {
        let (resolver, vault) = resolver(|| Ok(SecureString::new("k")));
        let err = resolver
            .resolve(Strategy::VaultResolvedKey, &config(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing { ref key } if key == keys::VAULT_ADDRESS));
        assert_eq!(vault.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ambient_identity_needs_no_config() {
        let (resolver, vault) = resolver(|| Ok(SecureString::new("k")));
        let material = resolver
            .resolve(Strategy::AmbientIdentity, &config(&[]))
            .await
            .unwrap();
        assert!(matches!(material, CredentialMaterial::AmbientIdentity(_)));
        assert_eq!(vault.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_source_for_reports_strategy() {
        let (resolver, _) = resolver(|| Ok(SecureString::new("k")));
        for strategy in Strategy::ALL {
            assert_eq!(resolver.source_for(strategy).strategy(), strategy);
        }
    }
}
