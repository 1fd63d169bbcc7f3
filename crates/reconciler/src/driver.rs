//! Reconciliation pass: list inputs, run the engine, write outputs.
//!
//! A pass is all-or-nothing up to the write step: every input is listed and
//! decoded, and every output document is built, before the first write. Any
//! failure before that point leaves every output untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use rulefold_core::labels::{
    ALERT_RULES_CLUSTER_LABEL, RECORD_RULES_CLUSTER_LABEL, RECORD_VMRULES_CLUSTER_LABEL,
    RELEASE_NAME_LABEL,
};
use rulefold_core::{Config, ObjectKey, ReleaseConfig};
use rulefold_rules::ingest::{ingest, BaseSource, OverrideCollection, RawInputs};
use rulefold_rules::merge::merge;
use rulefold_rules::model::{RuleKind, Scope};
use rulefold_rules::output::{build_alert_bundle, build_record_bundle, OutputDocument};
use rulefold_rules::RuleError;

use crate::error::{ReconcileError, StoreError};
use crate::events::{EventLog, EventReason, EventType};
use crate::manifest::ConfigObject;
use crate::store::ObjectStore;

/// Attempts per target when the store reports a version conflict.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

// ── Report ────────────────────────────────────────────────────

/// What the write step did with one output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Updated,
    /// Persisted data already equal to the computed document.
    Unchanged,
    /// Target lacks the ownership marker; left alone.
    NotOwned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub key: ObjectKey,
    pub status: WriteStatus,
}

/// Per-target outcomes of one successful pass, alert target first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl PassReport {
    pub fn updated_count(&self) -> usize {
        self.count(WriteStatus::Updated)
    }

    pub fn count(&self, status: WriteStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// A pass over unchanged inputs writes nothing.
    pub fn is_noop(&self) -> bool {
        self.updated_count() == 0
    }

    pub fn status_of(&self, key: &ObjectKey) -> Option<WriteStatus> {
        self.outcomes.iter().find(|o| &o.key == key).map(|o| o.status)
    }
}

// ── Target locks ──────────────────────────────────────────────

/// One mutex per output target, shared by every pass on the same driver.
#[derive(Default)]
struct TargetLocks {
    locks: Mutex<HashMap<ObjectKey, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    fn get(&self, key: &ObjectKey) -> Arc<Mutex<()>> {
        let mut guard = self.locks.lock().expect("target locks poisoned");
        Arc::clone(guard.entry(key.clone()).or_default())
    }
}

// ── Driver ────────────────────────────────────────────────────

/// Runs reconciliation passes against an [`ObjectStore`].
pub struct Reconciler<S: ObjectStore> {
    store: Arc<S>,
    release: ReleaseConfig,
    events: EventLog,
    locks: TargetLocks,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: Arc<S>, release: ReleaseConfig) -> Self {
        Self {
            store,
            release,
            events: EventLog::new(),
            locks: TargetLocks::default(),
        }
    }

    /// Build a driver from validated configuration.
    pub fn from_config(store: Arc<S>, config: &Config) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self::new(store, config.release.clone()))
    }

    /// Share an existing event log instead of the driver's own.
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn release(&self) -> &ReleaseConfig {
        &self.release
    }

    /// Run one full pass.
    pub fn reconcile(&self) -> Result<PassReport, ReconcileError> {
        let start = Instant::now();

        let raw = self.list_inputs()?;
        let targets = self.list_record_targets()?;
        debug!(
            base_sources = raw.base_sources.len(),
            overrides = raw.overrides.len(),
            record_targets = targets.len(),
            "listed inputs"
        );

        let ingested = ingest(&raw).map_err(|e| {
            self.record_rule_error(&e);
            e
        })?;
        let merged = merge(&ingested);

        // Build every document before touching any target.
        let mut outputs: Vec<(ObjectKey, OutputDocument)> = Vec::with_capacity(targets.len() + 1);
        outputs.push((self.release.alert_target(), build_alert_bundle(&merged.alerts)?));
        for (key, scope) in &targets {
            outputs.push((key.clone(), build_record_bundle(&merged.records, scope)?));
        }

        let mut report = PassReport::default();
        for (key, document) in &outputs {
            let status = self.write_target(key, document).map_err(|source| {
                error!(output = %key, error = %source, "failed to write output");
                self.events.record(
                    &key.to_string(),
                    EventType::Warning,
                    EventReason::OutputUpdateFailed,
                    source.to_string(),
                );
                ReconcileError::Write {
                    key: key.clone(),
                    source,
                }
            })?;
            report.outcomes.push(TargetOutcome {
                key: key.clone(),
                status,
            });
        }

        info!(
            targets = report.outcomes.len(),
            updated = report.updated_count(),
            unchanged = report.count(WriteStatus::Unchanged),
            not_owned = report.count(WriteStatus::NotOwned),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "reconciliation pass complete"
        );
        Ok(report)
    }

    // ── Listing ─────────────────────────────────────────────────

    fn list_inputs(&self) -> Result<RawInputs, ReconcileError> {
        let namespace = self.release.namespace.as_str();

        let mut selector = BTreeMap::new();
        selector.insert(RELEASE_NAME_LABEL.to_string(), self.release.name.clone());
        let base_sources = self
            .store
            .list_rule_sources(namespace, &selector)
            .map_err(listing("rule sources"))?
            .into_iter()
            .map(|obj| BaseSource {
                name: obj.metadata.key().to_string(),
                spec: obj.spec,
            })
            .collect();

        let mut overrides = Vec::new();
        for (kind, label) in [
            (RuleKind::Alert, ALERT_RULES_CLUSTER_LABEL),
            (RuleKind::Record, RECORD_RULES_CLUSTER_LABEL),
        ] {
            let configs = self
                .store
                .list_configs(Some(namespace), label)
                .map_err(listing(&format!("{kind} override collections")))?;
            overrides.extend(configs.into_iter().map(|obj| into_collection(obj, kind, label)));
        }

        Ok(RawInputs {
            base_sources,
            overrides,
        })
    }

    /// Record output targets across all namespaces, with the cluster each serves.
    fn list_record_targets(&self) -> Result<Vec<(ObjectKey, Scope)>, ReconcileError> {
        let configs = self
            .store
            .list_configs(None, RECORD_VMRULES_CLUSTER_LABEL)
            .map_err(listing("record output targets"))?;
        Ok(configs
            .into_iter()
            .map(|obj| {
                let scope = Scope::from_label(
                    obj.metadata.label(RECORD_VMRULES_CLUSTER_LABEL).unwrap_or_default(),
                );
                (obj.metadata.key(), scope)
            })
            .collect())
    }

    fn record_rule_error(&self, err: &RuleError) {
        if let RuleError::Decode {
            collection,
            scope,
            group,
            payload,
            ..
        } = err
        {
            error!(collection = %collection, cluster = %scope, group = %group, error = %err, "failed to decode override rules");
            self.events.record_with_details(
                collection,
                EventType::Warning,
                EventReason::RulesUnmarshalFailed,
                err.to_string(),
                Some(serde_json::json!({
                    "cluster": scope.label_value(),
                    "group": group,
                    "rules": payload,
                })),
            );
        }
    }

    // ── Write step ──────────────────────────────────────────────

    /// Guarded write of one target: equality check, ownership check, update.
    fn write_target(&self, key: &ObjectKey, document: &OutputDocument) -> Result<WriteStatus, StoreError> {
        let lock = self.locks.get(key);
        let _guard = lock.lock().expect("target lock poisoned");

        let mut attempt = 1;
        loop {
            let current = self
                .store
                .get_config(key)?
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;

            if document.same_content(&current.data) {
                debug!(output = %key, "output unchanged");
                return Ok(WriteStatus::Unchanged);
            }

            if !current.metadata.is_generated() {
                info!(output = %key, "output target not owned by this controller, skipping");
                self.events.record(
                    &key.to_string(),
                    EventType::Warning,
                    EventReason::OutputNotOwned,
                    "target lacks the generated marker; not updated",
                );
                return Ok(WriteStatus::NotOwned);
            }

            let next = ConfigObject {
                data: document.entries().clone(),
                ..current
            };
            match self.store.update_config(&next) {
                Ok(stored) => {
                    info!(output = %key, entries = document.len(), resource_version = stored.metadata.resource_version, "updated output");
                    self.events.record(
                        &key.to_string(),
                        EventType::Normal,
                        EventReason::OutputUpdated,
                        format!("updated {} entries", document.len()),
                    );
                    return Ok(WriteStatus::Updated);
                }
                Err(StoreError::Conflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    warn!(output = %key, attempt, "conflict updating output, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn into_collection(obj: ConfigObject, kind: RuleKind, label: &str) -> OverrideCollection {
    let scope = Scope::from_label(obj.metadata.label(label).unwrap_or_default());
    OverrideCollection {
        name: obj.metadata.key().to_string(),
        kind,
        scope,
        data: obj.data,
    }
}

fn listing(what: &str) -> impl Fn(StoreError) -> ReconcileError + '_ {
    move |source| ReconcileError::Listing {
        what: what.to_string(),
        source,
    }
}
