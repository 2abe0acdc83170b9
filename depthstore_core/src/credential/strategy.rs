//! Credential strategies

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named way of obtaining credentials for the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Shared key read from local configuration
    StaticKey,
    /// Shared key read from local configuration, for an account that is only
    /// reachable from a restricted network path
    NetworkRestrictedStaticKey,
    /// Shared key fetched at runtime from a secret store
    VaultResolvedKey,
    /// No stored secret; the platform identity authenticates
    AmbientIdentity,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::StaticKey,
        Strategy::NetworkRestrictedStaticKey,
        Strategy::VaultResolvedKey,
        Strategy::AmbientIdentity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaticKey => "static-key",
            Self::NetworkRestrictedStaticKey => "network-restricted-static-key",
            Self::VaultResolvedKey => "vault-resolved-key",
            Self::AmbientIdentity => "ambient-identity",
        }
    }

    /// True if the resolved material is a shared key
    pub fn uses_shared_key(self) -> bool {
        !matches!(self, Self::AmbientIdentity)
    }

    /// True if resolving this strategy performs a network call of its own
    pub fn resolves_remotely(self) -> bool {
        matches!(self, Self::VaultResolvedKey)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static-key" | "static" => Ok(Self::StaticKey),
            "network-restricted-static-key" | "network-restricted" => {
                Ok(Self::NetworkRestrictedStaticKey)
            }
            "vault-resolved-key" | "vault" => Ok(Self::VaultResolvedKey),
            "ambient-identity" | "ambient" => Ok(Self::AmbientIdentity),
            other => Err(Error::invalid_configuration(format!(
                "Unknown strategy: {other}. Supported: static-key, network-restricted-static-key, vault-resolved-key, ambient-identity"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_short_names() {
        assert_eq!("static-key".parse::<Strategy>().unwrap(), Strategy::StaticKey);
        assert_eq!(
            "Network-Restricted".parse::<Strategy>().unwrap(),
            Strategy::NetworkRestrictedStaticKey
        );
        assert_eq!("vault".parse::<Strategy>().unwrap(), Strategy::VaultResolvedKey);
        assert_eq!(
            " ambient-identity ".parse::<Strategy>().unwrap(),
            Strategy::AmbientIdentity
        );
    }

    #[test]
    fn test_unknown_strategy() {
        let err = "kerberos".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("kerberos"));
    }

    #[test]
    fn test_display_parses_back() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_material_shape() {
        assert!(Strategy::StaticKey.uses_shared_key());
        assert!(Strategy::VaultResolvedKey.uses_shared_key());
        assert!(!Strategy::AmbientIdentity.uses_shared_key());
        assert!(Strategy::VaultResolvedKey.resolves_remotely());
        assert!(!Strategy::NetworkRestrictedStaticKey.resolves_remotely());
    }
}
