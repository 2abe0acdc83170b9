use async_trait::async_trait;
use depthstore_core::identity::AmbientIdentity;
use depthstore_core::secrets::{SecretStore, SecretStoreError};
use depthstore_core::security::SecureString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Behavior {
    Serve,
    Unreachable(String),
    Forbidden(String),
}

/// Secret store returning canned secrets or a canned failure
///
/// Every fetch is counted, and the ambient identity is asked for a token first
/// the way a real vault client would.
///
/// # Examples
///
/// ```rust,no_run
/// use depthstore_test_utils::ScriptedSecretStore;
///
/// let vault = ScriptedSecretStore::new().with_secret("CosmosDbConnectionKey", "key==");
/// vault.go_offline("connection refused");
/// ```
#[derive(Clone, Default)]
pub struct ScriptedSecretStore {
    secrets: Arc<Mutex<HashMap<String, String>>>,
    behavior: Arc<Mutex<Option<Behavior>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.set_secret(name, value);
        self
    }

    pub fn set_secret(&self, name: &str, value: &str) {
        self.secrets
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_secret(&self, name: &str) {
        self.secrets.lock().unwrap().remove(name);
    }

    /// Fail every fetch as if the vault were down
    pub fn go_offline(&self, reason: &str) {
        *self.behavior.lock().unwrap() = Some(Behavior::Unreachable(reason.to_string()));
    }

    /// Fail every fetch as if the identity lacked access
    pub fn deny_access(&self, reason: &str) {
        *self.behavior.lock().unwrap() = Some(Behavior::Forbidden(reason.to_string()));
    }

    pub fn restore(&self) {
        *self.behavior.lock().unwrap() = Some(Behavior::Serve);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for ScriptedSecretStore {
    async fn fetch_secret(
        &self,
        _vault_address: &str,
        secret_name: &str,
        identity: &AmbientIdentity,
    ) -> Result<SecureString, SecretStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior.unwrap_or(Behavior::Serve) {
            Behavior::Unreachable(reason) => return Err(SecretStoreError::Unreachable(reason)),
            Behavior::Forbidden(reason) => return Err(SecretStoreError::Forbidden(reason)),
            Behavior::Serve => {}
        }

        identity
            .token(depthstore_core::identity::VAULT_SCOPE)
            .await
            .map_err(|e| SecretStoreError::Forbidden(e.to_string()))?;

        self.secrets
            .lock()
            .unwrap()
            .get(secret_name)
            .map(|value| SecureString::new(value.as_str()))
            .ok_or(SecretStoreError::NotFound)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
