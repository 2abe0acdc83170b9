//! Memory protection for credential material
//!
//! Shared keys and identity tokens are held in a [`SecureString`] so they are
//! zeroed on drop and never rendered by `Debug`/`Display`.

pub mod secure_string;

pub use secure_string::SecureString;
