//! Depthstore Core Library
//!
//! Credential resolution and document store provisioning. A scenario picks a
//! credential strategy and an endpoint; the resolved credential is handed to the
//! provisioner, which makes sure the database and container exist and returns a
//! [`Repository`] for item CRUD and queries.
//!
//! ```no_run
//! use depthstore_core::{
//!     ConnectionSelector, CredentialResolver, Item, Scenario, StoreProvisioner,
//!     identity::AmbientIdentity, secrets::FileSecretStore, store::MemoryStore,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn run() -> depthstore_core::Result<()> {
//! let config: HashMap<String, String> = HashMap::from([
//!     ("cosmosdb.simple_account".into(), "memory://primary".into()),
//!     ("cosmosdb.simple_key".into(), "key==".into()),
//! ]);
//! let selector = ConnectionSelector::new(
//!     CredentialResolver::new(Arc::new(FileSecretStore::new()), AmbientIdentity::from_environment()),
//!     StoreProvisioner::new(Arc::new(MemoryStore::new().with_account("memory://primary", "key=="))),
//!     Arc::new(config),
//! );
//!
//! let repo = selector.connect(Scenario::Simple).await?;
//! repo.add(&Item::new("1", "Milk", "2%")).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod provision;
pub mod repository;
pub mod secrets;
pub mod security;
pub mod selector;
pub mod store;

// Re-export main types
pub use credential::{CredentialMaterial, CredentialResolver, CredentialSource, Strategy};
pub use endpoint::{EndpointConfig, NetworkPath};
pub use error::{Error, ErrorKind, Result, deadline};
pub use provision::StoreProvisioner;
pub use repository::{Item, ItemStream, Repository};
pub use selector::{ConnectionSelector, Scenario};
