//! Test data builders

mod config;
mod items;

pub use config::ConfigBuilder;
pub use items::ItemBuilder;
