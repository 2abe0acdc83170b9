use crate::error::env_var_for;
use anyhow::{Context, Result};
use depthstore_core::config::{ConfigSource, FigmentSource, defaults, display_value, keys};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "DEPTHSTORE_";

/// One row of `config show`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: Option<String>,
    pub defaulted: bool,
}

impl ConfigEntry {
    /// Value as shown to the user; secret keys are redacted
    pub fn display(&self) -> String {
        match &self.value {
            Some(value) => display_value(self.key, value),
            None => "<unset>".to_string(),
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn default_config_path() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("depthstore/config.toml");
        }

        #[cfg(target_os = "linux")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config/depthstore/config.toml")
        }

        #[cfg(target_os = "macos")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Library/Application Support/depthstore/config.toml")
        }

        #[cfg(target_os = "windows")]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("depthstore\\config.toml")
        }
    }

    /// Layered configuration: ENV > File
    ///
    /// `DEPTHSTORE_COSMOSDB__SIMPLE_KEY` overrides `cosmosdb.simple_key`.
    pub fn figment(&self) -> Figment {
        let mut figment = Figment::new();

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment.merge(Serialized::defaults(env_overrides(|var| std::env::var(var).ok())))
    }

    /// Configuration source handed to the connection selector
    pub fn load(&self) -> FigmentSource {
        FigmentSource::new(self.figment())
    }

    /// Effective value of a known key, with its default applied
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let key = known_key(key)?;
        Ok(self.entry(&self.load(), key).value)
    }

    /// Write `key = value` to the config file
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = known_key(key)?;
        validate_value(key, value)?;

        let mut document = self.read_file()?;
        let (section, field) = split_key(key)?;
        let table = document
            .entry(section)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .with_context(|| format!("'{section}' in config file is not a table"))?;
        table.insert(field.to_string(), toml::Value::String(value.trim().to_string()));

        self.write_file(&document)?;
        log::debug!("Set {key} in {}", self.config_path.display());
        Ok(())
    }

    /// Remove `key` from the config file; returns whether it was present
    pub fn unset(&self, key: &str) -> Result<bool> {
        let key = known_key(key)?;
        if !self.config_path.exists() {
            return Ok(false);
        }

        let mut document = self.read_file()?;
        let (section, field) = split_key(key)?;
        let removed = document
            .get_mut(section)
            .and_then(toml::Value::as_table_mut)
            .and_then(|table| table.remove(field))
            .is_some();

        if removed {
            self.write_file(&document)?;
        }
        Ok(removed)
    }

    /// Every known key with its effective value
    pub fn list(&self) -> Vec<ConfigEntry> {
        let source = self.load();
        keys::ALL
            .iter()
            .map(|key| self.entry(&source, key))
            .collect()
    }

    fn entry(&self, source: &FigmentSource, key: &'static str) -> ConfigEntry {
        match source.get(key).filter(|value| !value.trim().is_empty()) {
            Some(value) => ConfigEntry {
                key,
                value: Some(value),
                defaulted: false,
            },
            None => ConfigEntry {
                key,
                value: defaults::for_key(key).map(str::to_string),
                defaulted: defaults::for_key(key).is_some(),
            },
        }
    }

    fn read_file(&self) -> Result<toml::Table> {
        if !self.config_path.exists() {
            return Ok(toml::Table::new());
        }

        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read {}", self.config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.config_path.display()))
    }

    fn write_file(&self, document: &toml::Table) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(document)?;
        fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))
    }
}

/// Known keys set in the environment, grouped by section
///
/// Values stay text: an all-digit key or a name like `007` is kept verbatim.
fn env_overrides(
    lookup: impl Fn(&str) -> Option<String>,
) -> BTreeMap<&'static str, BTreeMap<&'static str, String>> {
    let mut sections: BTreeMap<_, BTreeMap<_, _>> = BTreeMap::new();
    for key in keys::ALL.iter().copied() {
        let (Some((section, field)), Some(value)) = (key.split_once('.'), lookup(&env_var_for(key)))
        else {
            continue;
        };
        sections.entry(section).or_default().insert(field, value);
    }
    sections
}

fn known_key(key: &str) -> Result<&'static str> {
    keys::ALL
        .iter()
        .copied()
        .find(|known| *known == key)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown configuration key '{key}' (known keys: {})",
                keys::ALL.join(", ")
            )
        })
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .with_context(|| format!("Invalid key path: {key}"))
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("Value for '{key}' must not be blank");
    }

    if key == keys::PARTITION_KEY_PATH && !value.trim().starts_with('/') {
        anyhow::bail!("partition_key_path must start with '/', e.g. /id");
    }

    Ok(())
}
