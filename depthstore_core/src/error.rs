//! Error types for the depthstore core library
//!
//! Every failure the library can produce maps onto one kind of the error
//! taxonomy below. Kinds are never collapsed: a caller rendering a diagnostic
//! needs to know whether to fix a secret, the network, or the schema.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the depthstore core library
#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration key is absent or blank
    #[error("Missing required configuration: {key}")]
    ConfigurationMissing { key: String },

    /// A configuration value is present but malformed
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The secret store could not provide the requested secret
    #[error("Secret '{secret_name}' unavailable from vault {vault_address}: {reason}")]
    SecretUnavailable {
        vault_address: String,
        secret_name: String,
        reason: String,
    },

    /// The store refused the presented key or identity
    #[error("Authentication rejected: {reason}")]
    AuthenticationRejected { reason: String },

    /// The store could not be reached (network, DNS, timeout)
    #[error("Store unreachable: {reason}")]
    TransportUnreachable { reason: String },

    /// A create-if-absent raced with an incompatible existing resource
    #[error("Provisioning conflict on {resource}: {reason}")]
    ProvisioningConflict { resource: String, reason: String },

    /// A record with this id already exists in the collection
    #[error("Record with id '{id}' already exists")]
    DuplicateId { id: String },

    /// No record with this id exists in the collection
    #[error("Record with id '{id}' not found")]
    NotFound { id: String },

    /// The record's embedded id differs from the addressed id
    #[error("Record id mismatch: addressed '{expected}', record carries '{actual}'")]
    IdMismatch { expected: String, actual: String },

    /// A store response outside the taxonomy above
    #[error("Store error: {message}")]
    Store { message: String },
}

/// Fieldless discriminant of [`Error`], for callers that branch on kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigurationMissing,
    InvalidConfiguration,
    SecretUnavailable,
    AuthenticationRejected,
    TransportUnreachable,
    ProvisioningConflict,
    DuplicateId,
    NotFound,
    IdMismatch,
    Store,
}

impl ErrorKind {
    /// Short caller-facing hint on what to fix
    pub fn remediation(self) -> &'static str {
        match self {
            Self::ConfigurationMissing | Self::InvalidConfiguration => "fix configuration",
            Self::SecretUnavailable => "fix the vault secret or the identity's vault access",
            Self::AuthenticationRejected => "fix the key or the identity's store permissions",
            Self::TransportUnreachable => "fix network reachability to the store",
            Self::ProvisioningConflict => "fix the schema: an existing resource is incompatible",
            Self::DuplicateId => "use a fresh id",
            Self::NotFound => "check the record id",
            Self::IdMismatch => "make the record id match the addressed id",
            Self::Store => "inspect the store response",
        }
    }
}

impl Error {
    /// Create a configuration missing error
    pub fn configuration_missing(key: impl Into<String>) -> Self {
        Self::ConfigurationMissing { key: key.into() }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a secret unavailable error
    pub fn secret_unavailable(
        vault_address: impl Into<String>,
        secret_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SecretUnavailable {
            vault_address: vault_address.into(),
            secret_name: secret_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an authentication rejected error
    pub fn authentication_rejected(reason: impl Into<String>) -> Self {
        Self::AuthenticationRejected {
            reason: reason.into(),
        }
    }

    /// Create a transport unreachable error
    pub fn transport_unreachable(reason: impl Into<String>) -> Self {
        Self::TransportUnreachable {
            reason: reason.into(),
        }
    }

    /// Create a provisioning conflict error
    pub fn provisioning_conflict(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProvisioningConflict {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn id_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IdMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            Self::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Self::SecretUnavailable { .. } => ErrorKind::SecretUnavailable,
            Self::AuthenticationRejected { .. } => ErrorKind::AuthenticationRejected,
            Self::TransportUnreachable { .. } => ErrorKind::TransportUnreachable,
            Self::ProvisioningConflict { .. } => ErrorKind::ProvisioningConflict,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::IdMismatch { .. } => ErrorKind::IdMismatch,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// Check if this error could succeed on a later attempt
    ///
    /// The library itself never retries; this is information for callers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportUnreachable { .. })
    }

    /// Check if this error is a record-level logic error rather than an
    /// infrastructure failure
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId { .. } | Self::NotFound { .. } | Self::IdMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::store(format!("Malformed document: {err}"))
    }
}

/// Run `operation` with a caller-imposed deadline
///
/// Expiry is reported as [`Error::TransportUnreachable`].
pub async fn deadline<T, F>(limit: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(Error::transport_unreachable(format!(
            "operation did not complete within {}ms",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_configuration_missing_error() {
        let error = Error::configuration_missing("cosmosdb.simple_key");
        assert_eq!(error.kind(), ErrorKind::ConfigurationMissing);
        assert!(error.to_string().contains("Missing required configuration"));
        assert!(error.to_string().contains("cosmosdb.simple_key"));
    }

    #[test]
    fn test_secret_unavailable_error() {
        let error = Error::secret_unavailable(
            "https://vault.example.net/",
            "CosmosDbConnectionKey",
            "connection refused",
        );
        assert_eq!(error.kind(), ErrorKind::SecretUnavailable);
        assert!(error.to_string().contains("CosmosDbConnectionKey"));
        assert!(error.to_string().contains("https://vault.example.net/"));
        assert!(!error.is_transient());
    }

    #[test]
    fn test_transport_is_the_only_transient_kind() {
        assert!(Error::transport_unreachable("dns").is_transient());
        assert!(!Error::authentication_rejected("bad key").is_transient());
        assert!(!Error::not_found("1").is_transient());
        assert!(!Error::provisioning_conflict("Items", "pk").is_transient());
    }

    #[test]
    fn test_logic_errors() {
        assert!(Error::duplicate_id("1").is_logic_error());
        assert!(Error::not_found("1").is_logic_error());
        assert!(Error::id_mismatch("1", "2").is_logic_error());
        assert!(!Error::transport_unreachable("down").is_logic_error());
        assert!(!Error::authentication_rejected("expired").is_logic_error());
    }

    #[test]
    fn test_id_mismatch_names_both_ids() {
        let error = Error::id_mismatch("abc", "xyz");
        let display = error.to_string();
        assert!(display.contains("abc"));
        assert!(display.contains("xyz"));
    }

    #[test]
    fn test_remediation_differs_for_infrastructure_kinds() {
        let secret = ErrorKind::SecretUnavailable.remediation();
        let network = ErrorKind::TransportUnreachable.remediation();
        let schema = ErrorKind::ProvisioningConflict.remediation();
        assert_ne!(secret, network);
        assert_ne!(network, schema);
        assert_ne!(secret, schema);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = Error::store("boom");
        let _: &dyn StdError = &error;
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: Error = err.into();
        assert_eq!(error.kind(), ErrorKind::Store);
        assert!(error.to_string().contains("Malformed document"));
    }

    #[tokio::test]
    async fn test_deadline_maps_expiry_to_transport() {
        let result: Result<()> = deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::TransportUnreachable);
    }

    #[tokio::test]
    async fn test_deadline_passes_through_inner_result() {
        let ok = deadline(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<()> =
            deadline(Duration::from_secs(1), async { Err(Error::not_found("9")) }).await;
        assert_eq!(err.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
