//! Secret store collaborator
//!
//! The core consumes exactly one operation from a secret store: fetch a named
//! secret from a vault, authenticating as the ambient identity. There is no
//! retry contract; one failure is one error.

pub mod file;

use crate::identity::AmbientIdentity;
use crate::security::SecureString;
use async_trait::async_trait;
use thiserror::Error;

pub use file::FileSecretStore;

/// Errors a secret store can report
///
/// All of them become `Error::SecretUnavailable` at the credential layer.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The vault has no secret with that name
    #[error("secret not found")]
    NotFound,

    /// The identity was not allowed to read the secret
    #[error("access denied: {0}")]
    Forbidden(String),

    /// The vault could not be reached
    #[error("vault unreachable: {0}")]
    Unreachable(String),
}

/// A remote secret store reachable with the ambient identity
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch `secret_name` from the vault at `vault_address`
    async fn fetch_secret(
        &self,
        vault_address: &str,
        secret_name: &str,
        identity: &AmbientIdentity,
    ) -> Result<SecureString, SecretStoreError>;

    /// Get the name of this secret store implementation
    fn name(&self) -> &str;
}
