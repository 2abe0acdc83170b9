//! Item repository bound to one container

use crate::endpoint::EndpointConfig;
use crate::store::DocumentClient;
use crate::{Error, Result};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Query used by [`Repository::list_all`]
pub const SELECT_ALL: &str = "SELECT * FROM c";

/// A task item
///
/// `id` is assigned by the caller at creation time and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            completed: false,
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// Items produced by [`Repository::query`], consumed once
pub type ItemStream = BoxStream<'static, Result<Item>>;

/// CRUD and query over the items of one container
///
/// Cheap to clone; clones share the underlying client.
#[derive(Clone)]
pub struct Repository {
    client: Arc<dyn DocumentClient>,
    endpoint: EndpointConfig,
}

impl Repository {
    pub(crate) fn new(client: Arc<dyn DocumentClient>, endpoint: EndpointConfig) -> Self {
        Self { client, endpoint }
    }

    /// The account, database and container this repository is bound to
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Insert a new item; an existing id is [`Error::DuplicateId`]
    pub async fn add(&self, item: &Item) -> Result<()> {
        let document = serde_json::to_value(item)?;
        self.client
            .create_document(self.database(), self.container(), document)
            .await
            .map_err(|e| e.into_document_error(&item.id))?;
        log::debug!("Added item {}", item.id);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Item> {
        let document = self
            .client
            .read_document(self.database(), self.container(), id)
            .await
            .map_err(|e| e.into_document_error(id))?;
        Ok(serde_json::from_value(document)?)
    }

    /// Replace the item stored under `id` in full
    ///
    /// `item.id` must equal `id`; a mismatch is rejected before the store is
    /// contacted.
    pub async fn update(&self, id: &str, item: &Item) -> Result<()> {
        if item.id != id {
            return Err(Error::id_mismatch(id, &item.id));
        }

        let document = serde_json::to_value(item)?;
        self.client
            .replace_document(self.database(), self.container(), id, document)
            .await
            .map_err(|e| e.into_document_error(id))?;
        log::debug!("Updated item {id}");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete_document(self.database(), self.container(), id)
            .await
            .map_err(|e| e.into_document_error(id))?;
        log::debug!("Deleted item {id}");
        Ok(())
    }

    /// Run a read-only query in the store's own language
    ///
    /// The text goes to the store verbatim. Callers must not build it from
    /// untrusted input.
    pub async fn query(&self, query: &str) -> Result<ItemStream> {
        log::debug!("Querying {}/{}", self.database(), self.container());
        let documents = self
            .client
            .query_documents(self.database(), self.container(), query)
            .await?;

        Ok(documents
            .map(|row| -> Result<Item> { Ok(serde_json::from_value(row?)?) })
            .boxed())
    }

    /// Every item in the container, in store order
    pub async fn list_all(&self) -> Result<Vec<Item>> {
        self.query(SELECT_ALL).await?.try_collect().await
    }

    fn database(&self) -> &str {
        &self.endpoint.database_name
    }

    fn container(&self) -> &str {
        &self.endpoint.container_name
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialMaterial;
    use crate::provision::StoreProvisioner;
    use crate::store::MemoryStore;
    use crate::ErrorKind;

    const URI: &str = "memory://primary";

    async fn repository() -> Repository {
        let store = MemoryStore::new().with_account(URI, "k1");
        StoreProvisioner::new(Arc::new(store))
            .provision(
                CredentialMaterial::SharedKey("k1".into()),
                EndpointConfig::new(URI, "Tasks", "Items", "/id"),
            )
            .await
            .unwrap()
    }

    fn milk() -> Item {
        Item::new("1", "Milk", "2%")
    }

    #[test]
    fn test_item_json_shape() {
        let json = serde_json::to_value(milk()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "1", "name": "Milk", "description": "2%", "completed": false})
        );

        let sparse: Item = serde_json::from_str(r#"{"id": "2", "name": "Eggs"}"#).unwrap();
        assert_eq!(sparse.description, "");
        assert!(!sparse.completed);
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let repo = repository().await;
        repo.add(&milk()).await.unwrap();
        assert_eq!(repo.get("1").await.unwrap(), milk());
    }

    #[tokio::test]
    async fn test_duplicate_add_keeps_first() {
        let repo = repository().await;
        repo.add(&milk()).await.unwrap();

        let err = repo.add(&Item::new("1", "Other", "")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateId { ref id } if id == "1"));
        assert_eq!(repo.get("1").await.unwrap(), milk());
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let repo = repository().await;
        assert_eq!(repo.get("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            repo.update("nope", &Item::new("nope", "x", ""))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(repo.delete("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_id_mismatch_leaves_item() {
        let repo = repository().await;
        repo.add(&milk()).await.unwrap();

        let err = repo
            .update("1", &Item::new("2", "Changed", ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IdMismatch { ref expected, ref actual } if expected == "1" && actual == "2"
        ));
        assert_eq!(repo.get("1").await.unwrap(), milk());
    }

    #[tokio::test]
    async fn test_update_replaces_in_full() {
        let repo = repository().await;
        repo.add(&milk()).await.unwrap();

        let done = Item::new("1", "Milk", "").completed(true);
        repo.update("1", &done).await.unwrap();
        assert_eq!(repo.get("1").await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_query_and_list_all() {
        let repo = repository().await;
        repo.add(&milk()).await.unwrap();
        repo.add(&Item::new("2", "Bread", "").completed(true))
            .await
            .unwrap();

        let open: Vec<Item> = repo
            .query("SELECT * FROM c WHERE c.completed = false")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(open, vec![milk()]);

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "1");
    }

    #[tokio::test]
    async fn test_bad_query_is_store_error() {
        let repo = repository().await;
        let err = repo.query("UPDATE c SET x = 1").await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
