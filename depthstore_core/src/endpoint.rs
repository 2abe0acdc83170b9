//! Target store location

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Where the account is expected to be reachable from
///
/// This is a documented deployment precondition. Nothing in the library probes
/// the network; a restricted account that is not reachable fails like any other
/// unreachable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkPath {
    #[default]
    Public,
    /// Reachable only from inside a firewalled network segment
    Restricted,
}

/// The account, database and collection a repository is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub account_uri: String,
    pub database_name: String,
    pub container_name: String,
    pub partition_key_path: String,
    #[serde(default)]
    pub network_path: NetworkPath,
}

impl EndpointConfig {
    pub fn new(
        account_uri: impl Into<String>,
        database_name: impl Into<String>,
        container_name: impl Into<String>,
        partition_key_path: impl Into<String>,
    ) -> Self {
        Self {
            account_uri: account_uri.into(),
            database_name: database_name.into(),
            container_name: container_name.into(),
            partition_key_path: partition_key_path.into(),
            network_path: NetworkPath::Public,
        }
    }

    pub fn with_network_path(mut self, network_path: NetworkPath) -> Self {
        self.network_path = network_path;
        self
    }

    /// Check the fields before anything goes over the wire
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("account_uri", &self.account_uri),
            ("database_name", &self.database_name),
            ("container_name", &self.container_name),
            ("partition_key_path", &self.partition_key_path),
        ] {
            if value.trim().is_empty() {
                return Err(Error::configuration_missing(format!("endpoint.{field}")));
            }
        }

        if !self.partition_key_path.starts_with('/') || self.partition_key_path.len() < 2 {
            return Err(Error::invalid_configuration(format!(
                "partition key path '{}' must look like '/property'",
                self.partition_key_path
            )));
        }

        Ok(())
    }

    /// Property names along the partition key path (`/a/b` → `["a", "b"]`)
    pub fn partition_key_segments(&self) -> Vec<&str> {
        self.partition_key_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}
