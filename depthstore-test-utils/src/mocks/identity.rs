use async_trait::async_trait;
use chrono::{Duration, Utc};
use depthstore_core::identity::{AccessToken, AmbientIdentity, TokenCredential};
use depthstore_core::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Token credential issuing one fixed token
#[derive(Debug)]
pub struct StaticTokenCredential {
    token: String,
    lifetime: Duration,
    revoked: AtomicBool,
    calls: AtomicUsize,
}

impl StaticTokenCredential {
    pub fn new(token: &str) -> Arc<Self> {
        Self::with_lifetime(token, Duration::minutes(60))
    }

    /// Issue tokens that expire `lifetime` after each request
    pub fn with_lifetime(token: &str, lifetime: Duration) -> Arc<Self> {
        Arc::new(Self {
            token: token.to_string(),
            lifetime,
            revoked: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    /// Make further token requests fail with `AuthenticationRejected`
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Token requests served or refused so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn identity(self: &Arc<Self>) -> AmbientIdentity {
        AmbientIdentity::new(self.clone())
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.revoked.load(Ordering::SeqCst) {
            return Err(Error::authentication_rejected("identity revoked"));
        }
        Ok(AccessToken::new(self.token.as_str(), Utc::now() + self.lifetime))
    }

    fn name(&self) -> &str {
        "static-token"
    }
}
