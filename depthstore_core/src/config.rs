//! Configuration source collaborator
//!
//! The core only ever *reads* configuration, one key at a time. Anything that
//! can answer "what is the value of this dotted key" can drive it: a plain map in
//! tests, or a layered [`figment::Figment`] in the CLI.

use crate::{Error, Result};
use figment::Figment;
use figment::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Well-known configuration keys
pub mod keys {
    pub const SIMPLE_ACCOUNT: &str = "cosmosdb.simple_account";
    pub const SIMPLE_KEY: &str = "cosmosdb.simple_key";
    pub const NETWORK_PROTECTED_ACCOUNT: &str = "cosmosdb.network_protected_account";
    pub const NETWORK_PROTECTED_KEY: &str = "cosmosdb.network_protected_key";
    pub const DATABASE_NAME: &str = "cosmosdb.database_name";
    pub const CONTAINER_NAME: &str = "cosmosdb.container_name";
    pub const PARTITION_KEY_PATH: &str = "cosmosdb.partition_key_path";
    pub const VAULT_ADDRESS: &str = "keyvault.address";
    pub const VAULT_SECRET_NAME: &str = "keyvault.secret_name";

    pub const ALL: &[&str] = &[
        SIMPLE_ACCOUNT,
        SIMPLE_KEY,
        NETWORK_PROTECTED_ACCOUNT,
        NETWORK_PROTECTED_KEY,
        DATABASE_NAME,
        CONTAINER_NAME,
        PARTITION_KEY_PATH,
        VAULT_ADDRESS,
        VAULT_SECRET_NAME,
    ];

    /// Keys whose values are secrets and must be redacted when displayed
    pub const SECRET_KEYS: &[&str] = &[SIMPLE_KEY, NETWORK_PROTECTED_KEY];
}

/// Defaults applied when an optional key is absent
pub mod defaults {
    /// Default for `key`, if it has one
    pub fn for_key(key: &str) -> Option<&'static str> {
        match key {
            super::keys::DATABASE_NAME => Some(DATABASE_NAME),
            super::keys::CONTAINER_NAME => Some(CONTAINER_NAME),
            super::keys::PARTITION_KEY_PATH => Some(PARTITION_KEY_PATH),
            super::keys::VAULT_SECRET_NAME => Some(VAULT_SECRET_NAME),
            _ => None,
        }
    }

    pub const DATABASE_NAME: &str = "Tasks";
    pub const CONTAINER_NAME: &str = "Items";
    pub const PARTITION_KEY_PATH: &str = "/id";
    pub const VAULT_SECRET_NAME: &str = "CosmosDbConnectionKey";
}

/// Read-only key lookup
pub trait ConfigSource: Send + Sync {
    /// Look up a dotted key such as `cosmosdb.simple_key`
    fn get(&self, key: &str) -> Option<String>;
}

/// Fetch a required key; blank values count as missing
pub fn require(source: &dyn ConfigSource, key: &str) -> Result<String> {
    match source.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(Error::configuration_missing(key)),
    }
}

/// Fetch an optional key, falling back to `default` when absent or blank
pub fn get_or(source: &dyn ConfigSource, key: &str, default: &str) -> String {
    source
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// [`ConfigSource`] backed by a layered figment
///
/// Scalars are rendered to strings; tables and arrays are not addressable.
#[derive(Debug, Clone)]
pub struct FigmentSource {
    figment: Figment,
}

impl FigmentSource {
    pub fn new(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn figment(&self) -> &Figment {
        &self.figment
    }
}

impl From<Figment> for FigmentSource {
    fn from(figment: Figment) -> Self {
        Self::new(figment)
    }
}

impl ConfigSource for FigmentSource {
    fn get(&self, key: &str) -> Option<String> {
        let value = self.figment.find_value(key).ok()?;
        render_scalar(&value)
    }
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(_, s) => Some(s.clone()),
        Value::Char(_, c) => Some(c.to_string()),
        Value::Bool(_, b) => Some(b.to_string()),
        Value::Num(..) => value
            .to_i128()
            .map(|n| n.to_string())
            .or_else(|| value.to_u128().map(|n| n.to_string()))
            .or_else(|| value.to_f64().map(|f| f.to_string())),
        _ => None,
    }
}

/// Render a key/value for display, redacting secret keys
pub fn display_value(key: &str, value: &str) -> String {
    if keys::SECRET_KEYS.contains(&key) {
        "***".to_string()
    } else {
        value.to_string()
    }
}
