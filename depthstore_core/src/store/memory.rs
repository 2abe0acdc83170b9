//! In-memory document store emulator
//!
//! Accounts are registered up front with the keys and identity tokens they
//! accept. Every client request authenticates against the account before it
//! touches data, so a wrong key fails on the first provisioning call just like a
//! remote store would.

use super::auth::{ClientCredential, Presented};
use super::{
    CreateOutcome, Document, DocumentClient, DocumentStream, Query, StoreConnector, StoreError,
    document_id, partition_key_value,
};
use crate::credential::CredentialMaterial;
use crate::security::SecureString;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Account {
    keys: Vec<SecureString>,
    trusted_tokens: Vec<SecureString>,
    unreachable: bool,
    requests: usize,
    databases: BTreeMap<String, Database>,
}

#[derive(Default)]
struct Database {
    containers: BTreeMap<String, Container>,
}

struct Container {
    partition_key_path: String,
    /// Insertion order is the query order
    documents: Vec<Document>,
}

impl Account {
    fn accepts(&self, presented: &Presented<'_>) -> bool {
        match presented {
            Presented::Key(key) => self.keys.iter().any(|k| k.constant_time_eq(key)),
            Presented::Token(token) => self.trusted_tokens.iter().any(|t| t.constant_time_eq(token)),
        }
    }

    fn container_mut(&mut self, database: &str, container: &str) -> Result<&mut Container, StoreError> {
        self.databases
            .get_mut(database)
            .ok_or_else(|| StoreError::Other(format!("database '{database}' does not exist")))?
            .containers
            .get_mut(container)
            .ok_or_else(|| {
                StoreError::Other(format!(
                    "container '{container}' does not exist in database '{database}'"
                ))
            })
    }
}

/// Shared in-memory accounts; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    connections: Arc<AtomicUsize>,
}

fn normalize(account_uri: &str) -> String {
    account_uri.trim().trim_end_matches('/').to_string()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register_account`](Self::register_account)
    pub fn with_account(self, account_uri: &str, key: impl Into<SecureString>) -> Self {
        self.register_account(account_uri, key);
        self
    }

    /// Create an empty account accepting `key`, or add `key` to an existing one
    pub fn register_account(&self, account_uri: &str, key: impl Into<SecureString>) {
        self.lock()
            .entry(normalize(account_uri))
            .or_default()
            .keys
            .push(key.into());
    }

    /// Accept identity tokens equal to `token` on the account
    pub fn trust_identity_token(&self, account_uri: &str, token: impl Into<SecureString>) {
        self.lock()
            .entry(normalize(account_uri))
            .or_default()
            .trusted_tokens
            .push(token.into());
    }

    /// Simulate the account dropping off the network
    pub fn set_reachable(&self, account_uri: &str, reachable: bool) {
        if let Some(account) = self.lock().get_mut(&normalize(account_uri)) {
            account.unreachable = !reachable;
        }
    }

    /// Requests the account has received, including rejected ones
    pub fn request_count(&self, account_uri: &str) -> usize {
        self.lock()
            .get(&normalize(account_uri))
            .map_or(0, |account| account.requests)
    }

    /// Clients handed out by [`StoreConnector::connect`]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn database_exists(&self, account_uri: &str, database: &str) -> bool {
        self.lock()
            .get(&normalize(account_uri))
            .is_some_and(|account| account.databases.contains_key(database))
    }

    pub fn database_count(&self, account_uri: &str) -> usize {
        self.lock()
            .get(&normalize(account_uri))
            .map_or(0, |account| account.databases.len())
    }

    /// Partition key path of an existing container
    pub fn container_partition_key(
        &self,
        account_uri: &str,
        database: &str,
        container: &str,
    ) -> Option<String> {
        self.lock()
            .get(&normalize(account_uri))?
            .databases
            .get(database)?
            .containers
            .get(container)
            .map(|c| c.partition_key_path.clone())
    }

    pub fn document_count(&self, account_uri: &str, database: &str, container: &str) -> usize {
        self.lock()
            .get(&normalize(account_uri))
            .and_then(|account| account.databases.get(database))
            .and_then(|db| db.containers.get(container))
            .map_or(0, |c| c.documents.len())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        // A panic while holding the lock cannot leave an account half-written
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(
        &self,
        account_uri: &str,
        material: CredentialMaterial,
    ) -> Result<Arc<dyn DocumentClient>, StoreError> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Memory store client for {account_uri} using {}",
            material.kind()
        );
        Ok(Arc::new(MemoryClient {
            store: self.clone(),
            account_uri: normalize(account_uri),
            credential: ClientCredential::new(material),
        }))
    }
}

struct MemoryClient {
    store: MemoryStore,
    account_uri: String,
    credential: ClientCredential,
}

impl MemoryClient {
    /// Authenticate the request, then run `op` against the account
    async fn request<T>(
        &self,
        op: impl FnOnce(&mut Account) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.reach()?;
        let presented = self.credential.present().await?;

        let mut accounts = self.store.lock();
        let account = accounts
            .get_mut(&self.account_uri)
            .ok_or_else(|| self.unreachable())?;
        if !account.accepts(&presented) {
            return Err(StoreError::Unauthorized(format!(
                "credentials rejected by {}",
                self.account_uri
            )));
        }
        op(account)
    }

    fn reach(&self) -> Result<(), StoreError> {
        let mut accounts = self.store.lock();
        match accounts.get_mut(&self.account_uri) {
            Some(account) => {
                account.requests += 1;
                if account.unreachable {
                    Err(self.unreachable())
                } else {
                    Ok(())
                }
            }
            None => Err(self.unreachable()),
        }
    }

    fn unreachable(&self) -> StoreError {
        StoreError::Unreachable(format!("no store answering at {}", self.account_uri))
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    async fn create_database_if_not_exists(
        &self,
        database: &str,
    ) -> Result<CreateOutcome, StoreError> {
        self.request(|account| {
            if account.databases.contains_key(database) {
                return Ok(CreateOutcome::Existed);
            }
            account
                .databases
                .insert(database.to_string(), Database::default());
            Ok(CreateOutcome::Created)
        })
        .await
    }

    async fn create_container_if_not_exists(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<CreateOutcome, StoreError> {
        self.request(|account| {
            let db = account
                .databases
                .get_mut(database)
                .ok_or_else(|| StoreError::NotFound(format!("database '{database}'")))?;

            if let Some(existing) = db.containers.get(container) {
                if existing.partition_key_path != partition_key_path {
                    return Err(StoreError::Conflict(format!(
                        "container '{container}' is partitioned on {}, requested {partition_key_path}",
                        existing.partition_key_path
                    )));
                }
                return Ok(CreateOutcome::Existed);
            }

            db.containers.insert(
                container.to_string(),
                Container {
                    partition_key_path: partition_key_path.to_string(),
                    documents: Vec::new(),
                },
            );
            Ok(CreateOutcome::Created)
        })
        .await
    }

    async fn create_document(
        &self,
        database: &str,
        container: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.request(|account| {
            let target = account.container_mut(database, container)?;
            let id = document_id(&document)?;
            partition_key_value(&document, &target.partition_key_path)?;

            if target
                .documents
                .iter()
                .any(|existing| document_id(existing).ok() == Some(id))
            {
                return Err(StoreError::Conflict(format!("document '{id}' exists")));
            }
            target.documents.push(document);
            Ok(())
        })
        .await
    }

    async fn read_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
    ) -> Result<Document, StoreError> {
        self.request(|account| {
            account
                .container_mut(database, container)?
                .documents
                .iter()
                .find(|doc| document_id(doc).ok() == Some(id))
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("document '{id}'")))
        })
        .await
    }

    async fn replace_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.request(|account| {
            let target = account.container_mut(database, container)?;
            if document_id(&document)? != id {
                return Err(StoreError::BadRequest(format!(
                    "replacement body does not carry id '{id}'"
                )));
            }
            partition_key_value(&document, &target.partition_key_path)?;

            let slot = target
                .documents
                .iter_mut()
                .find(|doc| document_id(doc).ok() == Some(id))
                .ok_or_else(|| StoreError::NotFound(format!("document '{id}'")))?;
            *slot = document;
            Ok(())
        })
        .await
    }

    async fn delete_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        self.request(|account| {
            let target = account.container_mut(database, container)?;
            let index = target
                .documents
                .iter()
                .position(|doc| document_id(doc).ok() == Some(id))
                .ok_or_else(|| StoreError::NotFound(format!("document '{id}'")))?;
            target.documents.remove(index);
            Ok(())
        })
        .await
    }

    async fn query_documents(
        &self,
        database: &str,
        container: &str,
        query: &str,
    ) -> Result<DocumentStream, StoreError> {
        let results = self
            .request(|account| {
                let target = account.container_mut(database, container)?;
                let parsed = Query::parse(query)?;
                Ok(parsed.execute(target.documents.iter()))
            })
            .await?;
        Ok(futures::stream::iter(results.into_iter().map(Ok)).boxed())
    }
}
