//! Ambient platform identity
//!
//! An [`AmbientIdentity`] is an opaque handle meaning "authenticate as whatever
//! identity the platform gives this process". Creating the handle performs no
//! I/O; tokens are only requested when a collaborator (a store client or the
//! secret store) actually needs to present one.

pub mod environment;

use crate::Result;
use crate::security::SecureString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

pub use environment::EnvironmentIdentity;

/// Token scope used when authenticating to the document store
pub const STORE_SCOPE: &str = "https://cosmos.azure.com/.default";

/// Token scope used when authenticating to the secret store
pub const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// A bearer token issued to the ambient identity
#[derive(Clone)]
pub struct AccessToken {
    pub token: SecureString,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<SecureString>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_on <= Utc::now()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Something that can mint tokens for the platform identity
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Acquire a token for `scope`
    ///
    /// Failures are reported as `AuthenticationRejected` (the platform denied
    /// an identity) or `TransportUnreachable` (the token endpoint is down).
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;

    /// Human-readable name of this identity source
    fn name(&self) -> &str;
}

/// Opaque handle for "use the platform's ambient identity"
#[derive(Clone)]
pub struct AmbientIdentity {
    credential: Arc<dyn TokenCredential>,
}

impl AmbientIdentity {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self { credential }
    }

    /// The identity provided by the process environment
    pub fn from_environment() -> Self {
        Self::new(Arc::new(EnvironmentIdentity::default()))
    }

    /// Acquire a token for `scope`; this is the deferred handshake
    pub async fn token(&self, scope: &str) -> Result<AccessToken> {
        log::debug!(
            "Acquiring token for scope {scope} from {}",
            self.credential.name()
        );
        self.credential.get_token(scope).await
    }

    pub fn name(&self) -> &str {
        self.credential.name()
    }
}

impl fmt::Debug for AmbientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AmbientIdentity")
            .field(&self.credential.name())
            .finish()
    }
}
