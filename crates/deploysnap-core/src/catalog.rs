//! Message templates for human-readable descriptions
//!
//! Callers inject a [`MessageCatalog`] into the operations that write
//! descriptions; nothing here reads ambient locale state.

use std::collections::HashMap;

/// Key of the description given to a role created while attaching an attrib
pub const ROLE_ADDED_KEY: &str = "model.role.added";

/// Source of message templates keyed by a dotted message key
///
/// Templates use `{name}` as the snapshot name placeholder.
pub trait MessageCatalog {
    fn template(&self, key: &str) -> Option<&str>;
}

/// Catalog backed by a fixed map
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    templates: HashMap<String, String>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// English defaults for every key this crate uses
    pub fn english() -> Self {
        let mut catalog = Self::new();
        catalog.insert(ROLE_ADDED_KEY, "Added to snapshot {name}");
        catalog
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }
}

impl MessageCatalog for StaticCatalog {
    fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }
}

/// Render the template for `key` with the snapshot name filled in
///
/// A key missing from the catalog renders as `"<key> (<snapshot_name>)"` so
/// the gap stays visible.
pub fn format_description(
    catalog: &dyn MessageCatalog,
    key: &str,
    snapshot_name: &str,
) -> String {
    match catalog.template(key) {
        Some(template) => template.replace("{name}", snapshot_name),
        None => format!("{} ({})", key, snapshot_name),
    }
}
