//! Output document: file/key name → serialized text.

use std::collections::BTreeMap;

/// One output target's full content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDocument {
    entries: BTreeMap<String, String>,
}

impl OutputDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` to the entry at `key`, creating it if absent.
    pub fn append(&mut self, key: impl Into<String>, text: &str) {
        self.entries.entry(key.into()).or_default().push_str(text);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Byte-for-byte comparison against persisted content.
    pub fn same_content(&self, persisted: &BTreeMap<String, String>) -> bool {
        &self.entries == persisted
    }
}
