//! Command handlers
//!
//! Every store call runs under the session timeout. A timeout surfaces as a
//! transport failure, exactly like an unreachable account.

use crate::config::ConfigManager;
use crate::error::{CliError, CliResult, ErrorContext};
use crate::output::ItemFormatter;
use colored::*;
use depthstore_core::identity::environment::TOKEN_VAR;
use depthstore_core::secrets::FileSecretStore;
use depthstore_core::security::SecureString;
use depthstore_core::store::SqliteStore;
use depthstore_core::{
    ConnectionSelector, CredentialResolver, Item, Repository, Scenario, StoreProvisioner,
    deadline, identity::AmbientIdentity,
};
use futures::TryStreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Scenario, timeout and wiring shared by the item commands
pub struct Session {
    selector: ConnectionSelector,
    scenario: Scenario,
    timeout: Duration,
}

impl Session {
    /// Wire the bundled collaborators: file vault, environment identity and
    /// SQLite-backed accounts
    pub fn new(config: &ConfigManager, scenario: Scenario, timeout: Duration) -> Self {
        let resolver = CredentialResolver::new(
            Arc::new(FileSecretStore::new()),
            AmbientIdentity::from_environment(),
        );
        let provisioner = StoreProvisioner::new(Arc::new(SqliteStore::new()));
        let selector = ConnectionSelector::new(resolver, provisioner, Arc::new(config.load()));

        Self {
            selector,
            scenario,
            timeout,
        }
    }

    async fn repository(&self) -> CliResult<Repository> {
        log::debug!(
            "Opening repository for scenario {} (timeout {:?})",
            self.scenario,
            self.timeout
        );
        let repository = deadline(self.timeout, self.selector.connect(self.scenario)).await?;
        Ok(repository)
    }
}

pub async fn list(session: &Session, formatter: &dyn ItemFormatter) -> CliResult<()> {
    let repo = session.repository().await?;
    let items = deadline(session.timeout, repo.list_all()).await?;
    println!("{}", formatter.format_list(&items)?);
    Ok(())
}

/// Options for a new item
pub struct NewItem {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub completed: bool,
}

pub async fn add(
    session: &Session,
    formatter: &dyn ItemFormatter,
    new_item: NewItem,
) -> CliResult<()> {
    let id = new_item
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let item = Item::new(id, new_item.name, new_item.description).completed(new_item.completed);

    let repo = session.repository().await?;
    deadline(session.timeout, repo.add(&item)).await?;
    println!("{}", formatter.format_item(&item)?);
    Ok(())
}

pub async fn get(session: &Session, formatter: &dyn ItemFormatter, id: &str) -> CliResult<()> {
    let repo = session.repository().await?;
    let item = deadline(session.timeout, repo.get(id)).await?;
    println!("{}", formatter.format_item(&item)?);
    Ok(())
}

/// Field changes for an existing item; `None` keeps the stored value
#[derive(Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl ItemChanges {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.completed.is_none()
    }

    fn apply(self, item: &mut Item) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
    }
}

/// Read the item, apply `changes` and write it back in full
pub async fn update(
    session: &Session,
    formatter: &dyn ItemFormatter,
    id: &str,
    changes: ItemChanges,
) -> CliResult<()> {
    if changes.is_empty() {
        return Err(CliError::misuse("Nothing to update")
            .with_suggestion("Pass at least one of --name, --description or --completed"));
    }

    let repo = session.repository().await?;
    let mut item = deadline(session.timeout, repo.get(id)).await?;
    changes.apply(&mut item);
    deadline(session.timeout, repo.update(id, &item)).await?;
    println!("{}", formatter.format_item(&item)?);
    Ok(())
}

pub async fn delete(session: &Session, id: &str) -> CliResult<()> {
    let repo = session.repository().await?;
    deadline(session.timeout, repo.delete(id)).await?;
    println!("Deleted {}", id.cyan());
    Ok(())
}

pub async fn query(session: &Session, formatter: &dyn ItemFormatter, text: &str) -> CliResult<()> {
    let repo = session.repository().await?;
    let items = deadline(session.timeout, collect_query(&repo, text)).await?;
    println!("{}", formatter.format_list(&items)?);
    Ok(())
}

async fn collect_query(repo: &Repository, text: &str) -> depthstore_core::Result<Vec<Item>> {
    repo.query(text).await?.try_collect().await
}

/// Print the scenarios with their strategy and account key
pub fn scenarios() {
    for scenario in Scenario::ALL {
        println!(
            "{} {:<28} {}",
            format!("{:<18}", scenario.as_str()).bold(),
            scenario.strategy().as_str(),
            scenario.account_key()
        );
    }
}

/// Create (or extend) the account file at `path`
///
/// Without `--key` a fresh key is generated and printed exactly once.
pub async fn account_init(path: &Path, key: Option<String>) -> CliResult<()> {
    let (key, generated) = match key.filter(|k| !k.trim().is_empty()) {
        Some(key) => (SecureString::new(key.trim()), false),
        None => (generate_key(), true),
    };

    SqliteStore::init_account(path, &key)
        .await
        .map_err(depthstore_core::Error::from)?;

    println!(
        "{} account {}",
        "Initialized".green(),
        SqliteStore::account_uri(path)
    );
    if generated {
        println!("Account key: {}", key.expose_secret());
        eprintln!(
            "{}",
            "Store this key now; only its hash is kept in the account file.".yellow()
        );
    }
    Ok(())
}

/// Let the given identity token authenticate against the account at `path`
pub async fn account_trust(path: &Path, token: Option<String>) -> CliResult<()> {
    let token = token
        .or_else(|| std::env::var(TOKEN_VAR).ok())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            CliError::misuse("No identity token given")
                .with_suggestion(&format!("Pass --token or set {TOKEN_VAR}"))
        })?;

    SqliteStore::trust_identity(path, &SecureString::new(token.trim()))
        .await
        .map_err(depthstore_core::Error::from)?;

    println!(
        "{} identity on {}",
        "Trusted".green(),
        SqliteStore::account_uri(path)
    );
    Ok(())
}

fn generate_key() -> SecureString {
    // The prefix keeps an all-digit key from being read back as a number
    SecureString::new(format!(
        "ds-{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    ))
}

pub fn config_path(config: &ConfigManager) {
    println!("{}", config.config_path().display());
}

pub fn config_show(config: &ConfigManager) {
    for entry in config.list() {
        let value = entry.display();
        if entry.defaulted {
            println!("{} = {} {}", entry.key.bold(), value, "(default)".dimmed());
        } else {
            println!("{} = {}", entry.key.bold(), value);
        }
    }
}

pub fn config_get(config: &ConfigManager, key: &str) -> CliResult<()> {
    let value = config.get(key).map_err(configuration_error)?;
    match value {
        Some(value) => {
            println!("{}", depthstore_core::config::display_value(key, &value));
            Ok(())
        }
        None => Err(CliError::configuration(&format!("'{key}' is not set"))
            .with_suggestion(&format!("Run 'depthstore config set {key} <value>'"))),
    }
}

pub fn config_set(config: &ConfigManager, key: &str, value: &str) -> CliResult<()> {
    config.set(key, value).map_err(configuration_error)?;
    println!(
        "Set {} in {}",
        key.bold(),
        config.config_path().display()
    );
    Ok(())
}

pub fn config_unset(config: &ConfigManager, key: &str) -> CliResult<()> {
    if config.unset(key).map_err(configuration_error)? {
        println!("Removed {}", key.bold());
    } else {
        println!("{} was not set in {}", key, config.config_path().display());
    }
    Ok(())
}

fn configuration_error(error: anyhow::Error) -> CliError {
    CliError::configuration(&format!("{error:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_changes_apply() {
        let mut item = Item::new("1", "Milk", "2%");
        ItemChanges {
            completed: Some(true),
            ..Default::default()
        }
        .apply(&mut item);
        assert_eq!(item, Item::new("1", "Milk", "2%").completed(true));

        ItemChanges {
            name: Some("Oat milk".into()),
            description: Some(String::new()),
            completed: None,
        }
        .apply(&mut item);
        assert_eq!(item.name, "Oat milk");
        assert_eq!(item.description, "");
        assert!(item.completed);
    }

    #[test]
    fn test_empty_changes() {
        assert!(ItemChanges::default().is_empty());
    }

    #[test]
    fn test_generated_keys_are_distinct_strings() {
        let a = generate_key();
        let b = generate_key();
        assert!(a.expose_secret().starts_with("ds-"));
        assert_eq!(a.len(), 3 + 64);
        assert!(!a.constant_time_eq(&b));
    }
}
