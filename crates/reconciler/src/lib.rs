//! Reconciliation driver for the rule merge engine.
//!
//! This crate provides:
//! - Labeled object model and YAML manifests (two-pass envelope decoding)
//! - `ObjectStore` boundary with filesystem and in-memory implementations
//! - `Reconciler`: list inputs → ingest → merge → build → guarded writes
//! - In-memory event log of reconciliation outcomes
//! - Filesystem watcher that triggers debounced passes

pub mod driver;
pub mod error;
pub mod events;
pub mod manifest;
pub mod store;
pub mod watcher;

pub use driver::{PassReport, Reconciler, TargetOutcome, WriteStatus};
pub use error::{ReconcileError, StoreError};
