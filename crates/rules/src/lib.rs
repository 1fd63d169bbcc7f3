//! Multi-source monitoring-rule merge engine.
//!
//! This crate provides:
//! - Rule model with field-level patch between two rules
//! - Ingestion of base rule sources and scope-tagged override collections
//! - The precedence merge (base → default overrides → cluster overrides)
//! - Deterministic output documents: the alert-rule bundle and per-cluster
//!   record-rule bundles
//!
//! Everything here is pure: no I/O, no shared state across calls.

pub mod error;
pub mod ingest;
pub mod merge;
pub mod model;
pub mod output;

pub use error::{Result, RuleError};
