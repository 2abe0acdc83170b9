//! Store provisioning
//!
//! The provisioner is the only component that creates remote resources. It
//! turns credential material and an endpoint into a [`Repository`], ensuring the
//! database and container exist on the way.

use crate::credential::CredentialMaterial;
use crate::endpoint::EndpointConfig;
use crate::repository::Repository;
use crate::store::{CreateOutcome, StoreConnector};
use crate::Result;
use std::sync::Arc;

/// Builds repositories on top of a store connector
#[derive(Clone)]
pub struct StoreProvisioner {
    connector: Arc<dyn StoreConnector>,
}

impl StoreProvisioner {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    /// Connect, ensure the database and container exist, and bind a repository
    ///
    /// The material is moved into the client and dropped with it. Both
    /// create-if-absent steps treat "already exists" as success, so concurrent
    /// or repeated calls with the same endpoint are safe.
    pub async fn provision(
        &self,
        material: CredentialMaterial,
        endpoint: EndpointConfig,
    ) -> Result<Repository> {
        endpoint.validate()?;

        log::info!(
            "Provisioning {}/{} on {} ({} auth)",
            endpoint.database_name,
            endpoint.container_name,
            endpoint.account_uri,
            material.kind()
        );

        let client = self
            .connector
            .connect(&endpoint.account_uri, material)
            .await?;

        let outcome = client
            .create_database_if_not_exists(&endpoint.database_name)
            .await
            .map_err(|e| e.into_provisioning_error(&endpoint.database_name))?;
        log_outcome("Database", &endpoint.database_name, outcome);

        let outcome = client
            .create_container_if_not_exists(
                &endpoint.database_name,
                &endpoint.container_name,
                &endpoint.partition_key_path,
            )
            .await
            .map_err(|e| e.into_provisioning_error(&endpoint.container_name))?;
        log_outcome("Container", &endpoint.container_name, outcome);

        Ok(Repository::new(client, endpoint))
    }
}

fn log_outcome(resource: &str, name: &str, outcome: CreateOutcome) {
    match outcome {
        CreateOutcome::Created => log::debug!("{resource} {name} created"),
        CreateOutcome::Existed => log::debug!("{resource} {name} already exists"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Error, ErrorKind};

    const URI: &str = "memory://primary";

    fn endpoint() -> EndpointConfig {
        EndpointConfig::new(URI, "Tasks", "Items", "/id")
    }

    fn key(value: &str) -> CredentialMaterial {
        CredentialMaterial::SharedKey(value.into())
    }

    #[tokio::test]
    async fn test_provision_creates_database_and_container() {
        let store = MemoryStore::new().with_account(URI, "k1");
        let provisioner = StoreProvisioner::new(Arc::new(store.clone()));

        let repo = provisioner.provision(key("k1"), endpoint()).await.unwrap();
        assert_eq!(repo.endpoint(), &endpoint());
        assert!(store.database_exists(URI, "Tasks"));
        assert_eq!(
            store.container_partition_key(URI, "Tasks", "Items").as_deref(),
            Some("/id")
        );
    }

    #[tokio::test]
    async fn test_invalid_endpoint_never_connects() {
        let store = MemoryStore::new().with_account(URI, "k1");
        let provisioner = StoreProvisioner::new(Arc::new(store.clone()));

        let mut bad = endpoint();
        bad.database_name = String::new();
        let err = provisioner.provision(key("k1"), bad).await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing { .. }));
        assert_eq!(store.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_keep_their_kind() {
        let store = MemoryStore::new().with_account(URI, "k1");
        let provisioner = StoreProvisioner::new(Arc::new(store.clone()));

        let err = provisioner.provision(key("wrong"), endpoint()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationRejected);

        provisioner.provision(key("k1"), endpoint()).await.unwrap();
        let mut other_pk = endpoint();
        other_pk.partition_key_path = "/name".into();
        let err = provisioner.provision(key("k1"), other_pk).await.unwrap_err();
        assert!(matches!(err, Error::ProvisioningConflict { ref resource, .. } if resource == "Items"));

        store.set_reachable(URI, false);
        let err = provisioner.provision(key("k1"), endpoint()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportUnreachable);
    }
}
