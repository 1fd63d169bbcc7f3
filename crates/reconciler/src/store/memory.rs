//! In-process object store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use rulefold_core::ObjectKey;

use super::{check_version, in_namespace, ObjectStore, StoreResult};
use crate::error::StoreError;
use crate::manifest::{ConfigObject, RuleSourceObject};

/// Object store backed by ordered maps.
///
/// Inserted objects keep the resource version they were given; updates bump it.
#[derive(Default)]
pub struct MemoryObjectStore {
    configs: RwLock<BTreeMap<ObjectKey, ConfigObject>>,
    rule_sources: RwLock<BTreeMap<ObjectKey, RuleSourceObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a config object as-is.
    pub fn insert_config(&self, object: ConfigObject) {
        self.configs
            .write()
            .expect("configs lock poisoned")
            .insert(object.metadata.key(), object);
    }

    pub fn insert_rule_source(&self, object: RuleSourceObject) {
        self.rule_sources
            .write()
            .expect("rule_sources lock poisoned")
            .insert(object.metadata.key(), object);
    }

    pub fn remove_config(&self, key: &ObjectKey) -> Option<ConfigObject> {
        self.configs.write().expect("configs lock poisoned").remove(key)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list_configs(&self, namespace: Option<&str>, label_key: &str) -> StoreResult<Vec<ConfigObject>> {
        let guard = self.configs.read().expect("configs lock poisoned");
        Ok(guard
            .values()
            .filter(|obj| in_namespace(namespace, &obj.metadata.namespace))
            .filter(|obj| obj.metadata.has_label(label_key))
            .cloned()
            .collect())
    }

    fn list_rule_sources(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<RuleSourceObject>> {
        let guard = self.rule_sources.read().expect("rule_sources lock poisoned");
        Ok(guard
            .values()
            .filter(|obj| obj.metadata.namespace == namespace)
            .filter(|obj| obj.metadata.matches_labels(selector))
            .cloned()
            .collect())
    }

    fn get_config(&self, key: &ObjectKey) -> StoreResult<Option<ConfigObject>> {
        Ok(self.configs.read().expect("configs lock poisoned").get(key).cloned())
    }

    fn update_config(&self, object: &ConfigObject) -> StoreResult<ConfigObject> {
        let key = object.metadata.key();
        let mut guard = self.configs.write().expect("configs lock poisoned");
        let current = guard.get(&key).ok_or_else(|| StoreError::NotFound(key.clone()))?;
        check_version(
            &key,
            object.metadata.resource_version,
            current.metadata.resource_version,
        )?;

        let mut stored = object.clone();
        stored.metadata.resource_version = current.metadata.resource_version + 1;
        guard.insert(key, stored.clone());
        Ok(stored)
    }
}
