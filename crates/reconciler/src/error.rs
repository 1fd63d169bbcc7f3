//! Error types for the object stores and the reconciliation driver.

use std::path::PathBuf;

use rulefold_core::{ConfigError, ObjectKey};
use rulefold_rules::RuleError;

/// Errors raised by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[source] serde_yaml::Error),

    #[error("object {0} not found")]
    NotFound(ObjectKey),

    #[error("object {key} is defined by both {first} and {second}")]
    DuplicateKey {
        key: ObjectKey,
        first: PathBuf,
        second: PathBuf,
    },

    /// Optimistic-concurrency check failed: someone else updated the object.
    #[error("conflict updating {key}: expected resource version {expected}, found {actual}")]
    Conflict {
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },
}

/// Errors that abort a reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Input or target listing failed; nothing was written.
    #[error("failed to list {what}: {source}")]
    Listing {
        what: String,
        #[source]
        source: StoreError,
    },

    /// Decode or serialization failure inside the engine; nothing was written.
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// Reading or updating an output target failed.
    #[error("failed to write {key}: {source}")]
    Write {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
