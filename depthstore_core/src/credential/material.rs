//! Resolved credential material

use crate::identity::AmbientIdentity;
use crate::security::SecureString;
use std::fmt;

/// What a store client authenticates with
///
/// Neither `Serialize` nor `Clone`: a resolved key lives exactly
/// as long as the client it is moved into.
pub enum CredentialMaterial {
    /// Account shared key
    SharedKey(SecureString),
    /// Handle to the platform identity; tokens are acquired on first use
    AmbientIdentity(AmbientIdentity),
}

impl CredentialMaterial {
    /// Short label safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SharedKey(_) => "shared-key",
            Self::AmbientIdentity(_) => "ambient-identity",
        }
    }
}

impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey(_) => f.write_str("SharedKey(***)"),
            Self::AmbientIdentity(identity) => {
                f.debug_tuple("AmbientIdentity").field(&identity.name()).finish()
            }
        }
    }
}
