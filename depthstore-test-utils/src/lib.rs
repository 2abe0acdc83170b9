//! Test utilities for depthstore
//!
//! Builders for items and configuration, scripted collaborators for the vault,
//! the identity and the store connector, and a ready-made [`TestBacking`] that
//! wires them around an in-memory store.

pub mod builders;
pub mod fixture;
pub mod mocks;

// Re-export commonly used types
pub use builders::{ConfigBuilder, ItemBuilder};
pub use fixture::{TempVault, TestBacking};
pub use mocks::{CountingConnector, ScriptedSecretStore, StaticTokenCredential};
