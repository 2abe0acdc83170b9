//! Identity provided through the process environment
//!
//! Hosting platforms that assign an identity to a workload commonly project a
//! short-lived token into the process environment. [`EnvironmentIdentity`]
//! reads it on every request, so a rotated token is picked up without restart.

use super::{AccessToken, TokenCredential};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Variable holding the platform-issued bearer token
pub const TOKEN_VAR: &str = "DEPTHSTORE_IDENTITY_TOKEN";

/// Optional RFC 3339 expiry of the token in [`TOKEN_VAR`]
pub const EXPIRES_VAR: &str = "DEPTHSTORE_IDENTITY_EXPIRES_ON";

/// Assumed token lifetime when the platform does not publish an expiry
const DEFAULT_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct EnvironmentIdentity {
    token_var: String,
    expires_var: String,
}

impl Default for EnvironmentIdentity {
    fn default() -> Self {
        Self::with_vars(TOKEN_VAR, EXPIRES_VAR)
    }
}

impl EnvironmentIdentity {
    /// Read the token from custom variable names
    pub fn with_vars(token_var: impl Into<String>, expires_var: impl Into<String>) -> Self {
        Self {
            token_var: token_var.into(),
            expires_var: expires_var.into(),
        }
    }

    fn expiry(&self) -> Result<DateTime<Utc>> {
        match std::env::var(&self.expires_var) {
            Ok(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    Error::invalid_configuration(format!("{} is not RFC 3339: {e}", self.expires_var))
                }),
            Err(_) => Ok(Utc::now() + Duration::minutes(DEFAULT_LIFETIME_MINUTES)),
        }
    }
}

#[async_trait]
impl TokenCredential for EnvironmentIdentity {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let token = std::env::var(&self.token_var).unwrap_or_default();
        if token.trim().is_empty() {
            return Err(Error::authentication_rejected(format!(
                "no ambient identity available for scope {scope}: {} is not set",
                self.token_var
            )));
        }

        let token = AccessToken::new(token.trim().to_string(), self.expiry()?);
        if token.is_expired() {
            return Err(Error::authentication_rejected(format!(
                "ambient identity token for scope {scope} has expired"
            )));
        }
        Ok(token)
    }

    fn name(&self) -> &str {
        "environment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TEST_TOKEN_VAR: &str = "DEPTHSTORE_TEST_IDENTITY_TOKEN";
    const TEST_EXPIRES_VAR: &str = "DEPTHSTORE_TEST_IDENTITY_EXPIRES_ON";

    fn identity() -> EnvironmentIdentity {
        EnvironmentIdentity::with_vars(TEST_TOKEN_VAR, TEST_EXPIRES_VAR)
    }

    fn clear() {
        unsafe {
            std::env::remove_var(TEST_TOKEN_VAR);
            std::env::remove_var(TEST_EXPIRES_VAR);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_token_is_rejected() {
        clear();
        let err = identity().get_token("scope").await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationRejected { .. }));
        assert!(err.to_string().contains(TEST_TOKEN_VAR));
    }

    #[tokio::test]
    #[serial]
    async fn test_token_is_read_on_each_call() {
        clear();
        unsafe { std::env::set_var(TEST_TOKEN_VAR, "first") };
        let a = identity().get_token("scope").await.unwrap();
        unsafe { std::env::set_var(TEST_TOKEN_VAR, "second") };
        let b = identity().get_token("scope").await.unwrap();
        clear();

        assert_eq!(a.token.expose_secret(), "first");
        assert_eq!(b.token.expose_secret(), "second");
    }

    #[tokio::test]
    #[serial]
    async fn test_expired_token_is_rejected() {
        clear();
        unsafe {
            std::env::set_var(TEST_TOKEN_VAR, "old");
            std::env::set_var(TEST_EXPIRES_VAR, "2001-01-01T00:00:00Z");
        }
        let err = identity().get_token("scope").await.unwrap_err();
        clear();
        assert!(matches!(err, Error::AuthenticationRejected { .. }));
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_expiry_is_invalid_configuration() {
        clear();
        unsafe {
            std::env::set_var(TEST_TOKEN_VAR, "tok");
            std::env::set_var(TEST_EXPIRES_VAR, "tomorrow");
        }
        let err = identity().get_token("scope").await.unwrap_err();
        clear();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }
}
