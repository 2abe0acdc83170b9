//! Mock collaborators for testing

mod connector;
mod identity;
mod vault;

pub use connector::CountingConnector;
pub use identity::StaticTokenCredential;
pub use vault::ScriptedSecretStore;
