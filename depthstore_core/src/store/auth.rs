//! Credential presentation for emulator clients
//!
//! A client holds the material it was built with. Shared keys are presented
//! as-is; the ambient identity is exchanged for a token on the first request and
//! the token is reused until it expires.

use super::StoreError;
use crate::ErrorKind;
use crate::credential::CredentialMaterial;
use crate::identity::{AccessToken, STORE_SCOPE};
use crate::security::SecureString;
use tokio::sync::Mutex;

pub(crate) enum Presented<'a> {
    Key(&'a SecureString),
    Token(SecureString),
}

pub(crate) struct ClientCredential {
    material: CredentialMaterial,
    token: Mutex<Option<AccessToken>>,
}

impl ClientCredential {
    pub(crate) fn new(material: CredentialMaterial) -> Self {
        Self {
            material,
            token: Mutex::new(None),
        }
    }

    pub(crate) async fn present(&self) -> Result<Presented<'_>, StoreError> {
        match &self.material {
            CredentialMaterial::SharedKey(key) => Ok(Presented::Key(key)),
            CredentialMaterial::AmbientIdentity(identity) => {
                let mut cached = self.token.lock().await;
                if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
                    return Ok(Presented::Token(token.token.clone()));
                }

                let token = identity.token(STORE_SCOPE).await.map_err(|e| match e.kind() {
                    ErrorKind::TransportUnreachable => StoreError::Unreachable(e.to_string()),
                    _ => StoreError::Unauthorized(e.to_string()),
                })?;
                let value = token.token.clone();
                *cached = Some(token);
                Ok(Presented::Token(value))
            }
        }
    }
}
