use depthstore_core::Item;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Builder for [`Item`] values with sensible defaults
///
/// Ids default to a process-wide counter so builders never collide.
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    id: Option<String>,
    name: String,
    description: String,
    completed: bool,
}

impl Default for ItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            name: "Test item".to_string(),
            description: String::new(),
            completed: false,
        }
    }

    /// The item from the task list walkthrough
    pub fn milk() -> Self {
        Self::new().with_id("1").with_name("Milk").with_description("2%")
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    pub fn build(self) -> Item {
        let id = self
            .id
            .unwrap_or_else(|| format!("item-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)));
        Item::new(id, self.name, self.description).completed(self.completed)
    }

    /// `count` items named `<name> 1..=count`
    pub fn batch(count: usize, name: &str) -> Vec<Item> {
        (1..=count)
            .map(|n| ItemBuilder::new().with_name(&format!("{name} {n}")).build())
            .collect()
    }
}
