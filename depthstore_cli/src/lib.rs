//! Depthstore CLI library
//!
//! Command handlers, configuration layering and output formatting behind the
//! `depthstore` binary.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod terminal;
