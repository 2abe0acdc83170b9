mod formatters;

pub use formatters::{CsvFormatter, JsonFormatter, TextFormatter};

use anyhow::Result;
use depthstore_core::Item;

/// Output format enumeration
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Trait for item formatters
pub trait ItemFormatter: Send + Sync {
    /// Format a single item
    fn format_item(&self, item: &Item) -> Result<String>;

    /// Format a list of items, e.g. a query result
    fn format_list(&self, items: &[Item]) -> Result<String> {
        let formatted: Result<Vec<String>> = items.iter().map(|i| self.format_item(i)).collect();
        Ok(formatted?.join("\n"))
    }
}

/// Create a formatter based on output format
pub fn create_formatter(format: OutputFormat, use_color: bool) -> Box<dyn ItemFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Csv => Box::new(CsvFormatter::new()),
    }
}
