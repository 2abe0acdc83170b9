use depthstore_core::config::keys;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for flat key/value configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    values: HashMap<String, String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.values.remove(key);
        self
    }

    pub fn simple_account(self, account_uri: &str, key: &str) -> Self {
        self.set(keys::SIMPLE_ACCOUNT, account_uri)
            .set(keys::SIMPLE_KEY, key)
    }

    pub fn network_protected_account(self, account_uri: &str, key: &str) -> Self {
        self.set(keys::NETWORK_PROTECTED_ACCOUNT, account_uri)
            .set(keys::NETWORK_PROTECTED_KEY, key)
    }

    pub fn vault(self, address: &str) -> Self {
        self.set(keys::VAULT_ADDRESS, address)
    }

    pub fn build(self) -> HashMap<String, String> {
        self.values
    }

    pub fn build_shared(self) -> Arc<HashMap<String, String>> {
        Arc::new(self.values)
    }
}
