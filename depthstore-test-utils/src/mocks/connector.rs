use async_trait::async_trait;
use depthstore_core::CredentialMaterial;
use depthstore_core::store::{DocumentClient, StoreConnector, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Connector wrapper recording how many clients were requested
#[derive(Clone)]
pub struct CountingConnector {
    inner: Arc<dyn StoreConnector>,
    connects: Arc<AtomicUsize>,
}

impl CountingConnector {
    pub fn new(inner: Arc<dyn StoreConnector>) -> Self {
        Self {
            inner,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for CountingConnector {
    async fn connect(
        &self,
        account_uri: &str,
        material: CredentialMaterial,
    ) -> Result<Arc<dyn DocumentClient>, StoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect(account_uri, material).await
    }
}
