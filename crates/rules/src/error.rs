//! Error types for the merge engine.

use crate::model::{RuleKind, Scope};

/// Errors that abort a merge pass.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// An override payload is not well-formed for its declared kind.
    ///
    /// Carries the raw payload so the offending input can be diagnosed.
    #[error("failed to decode {kind} rules of collection '{collection}' (cluster {scope}, group '{group}'): {source}")]
    Decode {
        collection: String,
        kind: RuleKind,
        scope: Scope,
        group: String,
        payload: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A merged structure could not be re-encoded.
    #[error("failed to serialize {what} (cluster {scope}): {source}")]
    Serialize {
        what: String,
        scope: Scope,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, RuleError>;
