use super::ItemFormatter;
use anyhow::Result;
use colored::*;
use depthstore_core::Item;

/// Text formatter for human-readable output
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl ItemFormatter for TextFormatter {
    fn format_item(&self, item: &Item) -> Result<String> {
        let mark = if item.completed {
            self.colorize("[x]", |s| s.green())
        } else {
            "[ ]".to_string()
        };
        let id = self.colorize(&item.id, |s| s.cyan());

        let mut line = format!("{mark} {id}  {}", item.name);
        if !item.description.is_empty() {
            line.push_str(&format!(" - {}", self.colorize(&item.description, |s| s.dimmed())));
        }
        Ok(line)
    }

    fn format_list(&self, items: &[Item]) -> Result<String> {
        if items.is_empty() {
            return Ok(self.colorize("No items.", |s| s.yellow()));
        }

        let lines: Result<Vec<String>> = items.iter().map(|i| self.format_item(i)).collect();
        let mut output = lines?.join("\n");
        output.push_str(&format!("\n\n{} item(s)", items.len()));
        Ok(output)
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ItemFormatter for JsonFormatter {
    fn format_item(&self, item: &Item) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(item)?)
        } else {
            Ok(serde_json::to_string(item)?)
        }
    }

    fn format_list(&self, items: &[Item]) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(items)?)
        } else {
            Ok(serde_json::to_string(items)?)
        }
    }
}

/// CSV formatter for tabular output
#[derive(Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        Self
    }

    const HEADERS: [&'static str; 4] = ["id", "name", "description", "completed"];

    fn write(items: &[Item]) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(Self::HEADERS)?;

        for item in items {
            let completed = item.completed.to_string();
            wtr.write_record([
                item.id.as_str(),
                item.name.as_str(),
                item.description.as_str(),
                completed.as_str(),
            ])?;
        }

        let data = wtr.into_inner()?;
        Ok(String::from_utf8(data)?.trim_end().to_string())
    }
}

impl ItemFormatter for CsvFormatter {
    fn format_item(&self, item: &Item) -> Result<String> {
        Self::write(std::slice::from_ref(item))
    }

    fn format_list(&self, items: &[Item]) -> Result<String> {
        Self::write(items)
    }
}
