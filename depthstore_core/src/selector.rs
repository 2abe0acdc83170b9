//! Scenario selection
//!
//! A [`Scenario`] names a deployment setup. The [`ConnectionSelector`] maps it
//! to a strategy and an endpoint, resolves the credential material and hands it
//! straight to the provisioner. The material never outlives that hand-off here.

use crate::config::{self, ConfigSource, defaults, keys};
use crate::credential::{CredentialResolver, Strategy};
use crate::endpoint::{EndpointConfig, NetworkPath};
use crate::provision::StoreProvisioner;
use crate::repository::Repository;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A named deployment setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Public account, key in local configuration
    #[default]
    Simple,
    /// Firewalled account, key in local configuration
    NetworkProtected,
    /// Public account, key fetched from the vault
    KeyVault,
    /// Public account, no stored secret
    ManagedIdentity,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Simple,
        Scenario::NetworkProtected,
        Scenario::KeyVault,
        Scenario::ManagedIdentity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::NetworkProtected => "network-protected",
            Self::KeyVault => "key-vault",
            Self::ManagedIdentity => "managed-identity",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Self::Simple => Strategy::StaticKey,
            Self::NetworkProtected => Strategy::NetworkRestrictedStaticKey,
            Self::KeyVault => Strategy::VaultResolvedKey,
            Self::ManagedIdentity => Strategy::AmbientIdentity,
        }
    }

    /// Configuration key holding the account URI
    pub fn account_key(self) -> &'static str {
        match self {
            Self::NetworkProtected => keys::NETWORK_PROTECTED_ACCOUNT,
            _ => keys::SIMPLE_ACCOUNT,
        }
    }

    pub fn network_path(self) -> NetworkPath {
        match self {
            Self::NetworkProtected => NetworkPath::Restricted,
            _ => NetworkPath::Public,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == normalized)
            .ok_or_else(|| {
                Error::invalid_configuration(format!(
                    "unknown scenario '{s}' (expected one of: simple, network-protected, key-vault, managed-identity)"
                ))
            })
    }
}

/// Drives credential resolution and provisioning for a scenario
#[derive(Clone)]
pub struct ConnectionSelector {
    resolver: CredentialResolver,
    provisioner: StoreProvisioner,
    config: Arc<dyn ConfigSource>,
}

impl ConnectionSelector {
    pub fn new(
        resolver: CredentialResolver,
        provisioner: StoreProvisioner,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            resolver,
            provisioner,
            config,
        }
    }

    /// The endpoint `scenario` targets, read from configuration
    pub fn endpoint_for(&self, scenario: Scenario) -> Result<EndpointConfig> {
        let source = self.config.as_ref();
        let account_uri = config::require(source, scenario.account_key())?;
        let endpoint = EndpointConfig::new(
            account_uri,
            config::get_or(source, keys::DATABASE_NAME, defaults::DATABASE_NAME),
            config::get_or(source, keys::CONTAINER_NAME, defaults::CONTAINER_NAME),
            config::get_or(source, keys::PARTITION_KEY_PATH, defaults::PARTITION_KEY_PATH),
        )
        .with_network_path(scenario.network_path());
        Ok(endpoint)
    }

    /// Resolve credentials for `scenario` and provision its repository
    ///
    /// The endpoint is read first, so a missing account fails before any
    /// credential work. The first failure is returned unchanged.
    pub async fn connect(&self, scenario: Scenario) -> Result<Repository> {
        let endpoint = self.endpoint_for(scenario)?;
        let strategy = scenario.strategy();
        log::info!("Connecting with scenario {scenario} (strategy {strategy})");

        let material = self.resolver.resolve(strategy, self.config.as_ref()).await?;
        self.provisioner.provision(material, endpoint).await
    }

    pub async fn connect_static_key(&self) -> Result<Repository> {
        self.connect(Scenario::Simple).await
    }

    pub async fn connect_network_restricted(&self) -> Result<Repository> {
        self.connect(Scenario::NetworkProtected).await
    }

    pub async fn connect_vault_key(&self) -> Result<Repository> {
        self.connect(Scenario::KeyVault).await
    }

    pub async fn connect_ambient_identity(&self) -> Result<Repository> {
        self.connect(Scenario::ManagedIdentity).await
    }
}
