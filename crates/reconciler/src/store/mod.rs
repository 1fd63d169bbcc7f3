//! Object store boundary: where inputs are listed and outputs are written.
//!
//! Every listing returns objects sorted by `(namespace, name)` so a pass over
//! an unchanged store sees the same input order every time.

mod fs;
mod memory;


use std::collections::BTreeMap;

use rulefold_core::ObjectKey;

use crate::error::StoreError;
use crate::manifest::{ConfigObject, RuleSourceObject};

pub use self::fs::{is_manifest_path, FsObjectStore, WriteJournal};
pub use self::memory::MemoryObjectStore;

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend for labeled objects.
///
/// Implementations must be safe to share between the watch loop and the
/// blocking pass workers.
pub trait ObjectStore: Send + Sync {
    /// Config objects carrying `label_key` (any value), optionally restricted
    /// to one namespace.
    fn list_configs(&self, namespace: Option<&str>, label_key: &str) -> StoreResult<Vec<ConfigObject>>;

    /// Rule sources in `namespace` whose labels match every selector pair.
    fn list_rule_sources(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<RuleSourceObject>>;

    fn get_config(&self, key: &ObjectKey) -> StoreResult<Option<ConfigObject>>;

    /// Replace a config object's data, labels and annotations.
    ///
    /// `object.metadata.resource_version` must equal the stored version,
    /// otherwise [`StoreError::Conflict`]. Returns the stored object with its
    /// new resource version.
    fn update_config(&self, object: &ConfigObject) -> StoreResult<ConfigObject>;
}

/// Shared check for `update_config` implementations.
pub(crate) fn check_version(key: &ObjectKey, expected: u64, actual: u64) -> StoreResult<()> {
    if expected != actual {
        return Err(StoreError::Conflict {
            key: key.clone(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Whether a listed object falls within the requested namespace.
pub(crate) fn in_namespace(namespace: Option<&str>, actual: &str) -> bool {
    namespace.map_or(true, |ns| ns == actual)
}
