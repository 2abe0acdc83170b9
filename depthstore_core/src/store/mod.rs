//! Document store collaborator
//!
//! The wire protocol of the remote store is opaque to the core. It talks to the
//! store through two traits: a [`StoreConnector`] that turns an account URI and
//! credential material into an authenticated [`DocumentClient`], and the client
//! itself. Two emulators ship with the crate: [`memory::MemoryStore`] and,
//! behind the `sqlite` feature, [`sqlite::SqliteStore`].

mod auth;
pub mod memory;
pub mod query;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::Error;
use crate::credential::CredentialMaterial;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryStore;
pub use query::{Query, QueryError};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A stored JSON document
pub type Document = serde_json::Value;

/// Lazily produced query results, consumed once
pub type DocumentStream = BoxStream<'static, Result<Document, StoreError>>;

/// Whether a create-if-absent call created the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Existed,
}

/// Errors reported by a document store
///
/// The mapping into [`Error`] depends on the operation: a conflict is a
/// duplicate id when inserting a document but a provisioning conflict when
/// creating a container.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key or identity rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network, DNS or timeout failure
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Resource already exists in an incompatible shape
    #[error("conflict: {0}")]
    Conflict(String),

    /// Addressed resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed (e.g. a query the store cannot parse)
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Map a failure from database or container provisioning
    pub fn into_provisioning_error(self, resource: &str) -> Error {
        match self {
            Self::Conflict(reason) => Error::provisioning_conflict(resource, reason),
            other => other.into(),
        }
    }

    /// Map a failure from a point operation on document `id`
    pub fn into_document_error(self, id: &str) -> Error {
        match self {
            Self::Conflict(_) => Error::duplicate_id(id),
            Self::NotFound(_) => Error::not_found(id),
            other => other.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized(reason) => Error::authentication_rejected(reason),
            StoreError::Unreachable(reason) => Error::transport_unreachable(reason),
            StoreError::Conflict(reason) => Error::store(format!("conflict: {reason}")),
            StoreError::NotFound(reason) => Error::store(format!("not found: {reason}")),
            StoreError::BadRequest(reason) => Error::store(format!("bad request: {reason}")),
            StoreError::Other(reason) => Error::store(reason),
        }
    }
}

impl From<QueryError> for StoreError {
    fn from(err: QueryError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Builds authenticated clients for an account
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Construct a client for `account_uri` that authenticates with `material`
    ///
    /// Implementations may defer the authentication handshake to the first
    /// request. The material is moved into the client and dropped with it.
    async fn connect(
        &self,
        account_uri: &str,
        material: CredentialMaterial,
    ) -> Result<Arc<dyn DocumentClient>, StoreError>;
}

/// An authenticated handle on one account
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Create the database unless it exists
    async fn create_database_if_not_exists(
        &self,
        database: &str,
    ) -> Result<CreateOutcome, StoreError>;

    /// Create the container unless it exists
    ///
    /// An existing container with a different partition key path is a
    /// [`StoreError::Conflict`].
    async fn create_container_if_not_exists(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<CreateOutcome, StoreError>;

    /// Insert a document; an existing id is a [`StoreError::Conflict`]
    async fn create_document(
        &self,
        database: &str,
        container: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    async fn read_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
    ) -> Result<Document, StoreError>;

    /// Replace the document stored under `id` in full
    async fn replace_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    async fn delete_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
    ) -> Result<(), StoreError>;

    /// Execute a read-only query; the text is interpreted by the store
    async fn query_documents(
        &self,
        database: &str,
        container: &str,
        query: &str,
    ) -> Result<DocumentStream, StoreError>;
}

/// Extract the `id` property every document must carry
pub(crate) fn document_id(document: &Document) -> Result<&str, StoreError> {
    document
        .get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::BadRequest("document has no string 'id' property".into()))
}

/// Resolve the partition key value of `document` at `/a/b` style `path`
pub(crate) fn partition_key_value<'a>(
    document: &'a Document,
    path: &str,
) -> Result<&'a Document, StoreError> {
    let mut current = document;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = current.get(segment).ok_or_else(|| {
            StoreError::BadRequest(format!("document has no value at partition key path {path}"))
        })?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_conflict_mapping_depends_on_operation() {
        let provisioning = StoreError::Conflict("pk differs".into()).into_provisioning_error("Items");
        assert_eq!(provisioning.kind(), ErrorKind::ProvisioningConflict);

        let document = StoreError::Conflict("exists".into()).into_document_error("1");
        assert_eq!(document.kind(), ErrorKind::DuplicateId);
    }

    #[test]
    fn test_not_found_mapping() {
        let err = StoreError::NotFound("gone".into()).into_document_error("42");
        assert!(matches!(err, Error::NotFound { ref id } if id == "42"));

        let err: Error = StoreError::NotFound("database Tasks".into()).into();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn test_infrastructure_kinds_survive_every_mapping() {
        for err in [
            StoreError::Unauthorized("bad key".into()).into_document_error("1"),
            StoreError::Unauthorized("bad key".into()).into_provisioning_error("Tasks"),
        ] {
            assert_eq!(err.kind(), ErrorKind::AuthenticationRejected);
        }
        for err in [
            StoreError::Unreachable("dns".into()).into_document_error("1"),
            StoreError::Unreachable("dns".into()).into_provisioning_error("Tasks"),
        ] {
            assert_eq!(err.kind(), ErrorKind::TransportUnreachable);
        }
    }

    #[test]
    fn test_query_error_is_bad_request() {
        let err: StoreError = QueryError::UnterminatedString.into();
        assert!(matches!(err, StoreError::BadRequest(_)));
    }

    #[test]
    fn test_document_helpers() {
        let doc = json!({"id": "a", "address": {"city": "Oslo"}});
        assert_eq!(document_id(&doc).unwrap(), "a");
        assert_eq!(partition_key_value(&doc, "/address/city").unwrap(), "Oslo");
        assert!(partition_key_value(&doc, "/zip").is_err());
        assert!(document_id(&json!({"id": 1})).is_err());
    }
}
