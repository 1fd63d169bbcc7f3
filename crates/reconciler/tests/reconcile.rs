//! Full reconciliation passes against in-memory and filesystem stores.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rulefold_core::labels::{
    ALERT_RULES_CLUSTER_LABEL, GENERATED_LABEL, GENERATED_VALUE, RECORD_RULES_CLUSTER_LABEL,
    RECORD_VMRULES_CLUSTER_LABEL, RELEASE_NAME_LABEL,
};
use rulefold_core::{ObjectKey, ObjectMeta, ReleaseConfig};
use rulefold_reconciler::events::{EventQuery, EventReason};
use rulefold_reconciler::manifest::{ConfigObject, RuleSourceObject};
use rulefold_reconciler::store::{FsObjectStore, MemoryObjectStore, ObjectStore, StoreResult};
use rulefold_reconciler::{ReconcileError, Reconciler, StoreError, WriteStatus};
use rulefold_rules::RuleError;

const RELEASE: &str = "kof-mothership";
const NAMESPACE: &str = "kof";

const BASE_RULES: &str = r#"
groups:
  - name: kubernetes-resources
    rules:
      - record: instance:node_vmstat_pgmajfault:rate5m
        expr: rate(node_vmstat_pgmajfault{job="node-exporter"}[5m])
      - alert: CPUThrottlingHigh
        expr: throttled > 0.25
        for: 15m
        labels:
          severity: info
  - name: record-group0
    rules:
      - record: count:up0_from_prometheus_rule
        expr: count (up == 0)
  - name: record-group1
    rules:
      - record: count:up1_from_prometheus_rule
        expr: count (up == 1)
"#;

const EXPECTED_REGIONAL1_VALUES: &str = r#"vmrules:
  groups:
    kubernetes-resources:
    - expr: rate(node_vmstat_pgmajfault{job="node-exporter"}[5m])
      record: instance:node_vmstat_pgmajfault:rate5m
    record-group0:
    - expr: count (up == 0)
      record: count:up0_from_prometheus_rule
    record-group1:
    - expr: count (up{cluster="child2"} == 1)
      record: count:child2_up1
    - expr: count (up{cluster="child3"} == 1)
      record: count:child3_up1
    record-group10:
    - expr: count (up >= 0)
      record: count:default_up10
"#;

fn release() -> ReleaseConfig {
    ReleaseConfig::new(RELEASE, NAMESPACE)
}

fn alert_target_key() -> ObjectKey {
    release().alert_target()
}

fn record_target_key() -> ObjectKey {
    ObjectKey::new(NAMESPACE, "kof-record-vmrules-regional1")
}

fn override_collection(name: &str, label: &str, cluster: &str) -> ConfigObject {
    ConfigObject::new(ObjectMeta::new(NAMESPACE, name).with_label(label, cluster))
}

/// Objects of the controller scenario: one base source, two alert and two
/// record override collections, and both output targets.
fn seed_objects() -> (Vec<ConfigObject>, Vec<RuleSourceObject>) {
    let configs = vec![
        override_collection("promxy-rules-default", ALERT_RULES_CLUSTER_LABEL, "").with_data(
            "kubernetes-resources",
            "CPUThrottlingHigh:\n  expr: default_throttled > 0.25\n  for: 10m\n",
        ),
        override_collection("promxy-rules-cluster1", ALERT_RULES_CLUSTER_LABEL, "cluster1")
            .with_data(
                "kubernetes-resources",
                "CPUThrottlingHigh:\n  expr: cluster1_throttled > 0.42\n",
            ),
        override_collection("record-rules-default", RECORD_RULES_CLUSTER_LABEL, "")
            .with_data("record-group1", "- expr: count (up == 1)\n  record: count:default_up1\n")
            .with_data("record-group10", "- expr: count (up >= 0)\n  record: count:default_up10\n"),
        override_collection("record-rules-regional1", RECORD_RULES_CLUSTER_LABEL, "regional1")
            .with_data(
                "record-group1",
                "- expr: count (up{cluster=\"child2\"} == 1)\n  record: count:child2_up1\n- expr: count (up{cluster=\"child3\"} == 1)\n  record: count:child3_up1\n",
            ),
        ConfigObject::new(
            ObjectMeta::new(NAMESPACE, alert_target_key().name)
                .with_label(GENERATED_LABEL, GENERATED_VALUE),
        ),
        ConfigObject::new(
            ObjectMeta::new(NAMESPACE, record_target_key().name)
                .with_label(RECORD_VMRULES_CLUSTER_LABEL, "regional1")
                .with_label(GENERATED_LABEL, GENERATED_VALUE),
        ),
    ];

    let sources = vec![RuleSourceObject::new(
        ObjectMeta::new(NAMESPACE, "test-prometheus-rule").with_label(RELEASE_NAME_LABEL, RELEASE),
        serde_yaml::from_str(BASE_RULES).unwrap(),
    )];
    (configs, sources)
}

fn memory_store() -> Arc<MemoryObjectStore> {
    let store = MemoryObjectStore::new();
    let (configs, sources) = seed_objects();
    configs.into_iter().for_each(|c| store.insert_config(c));
    sources.into_iter().for_each(|s| store.insert_rule_source(s));
    Arc::new(store)
}

fn data_of<S: ObjectStore>(store: &S, key: &ObjectKey) -> BTreeMap<String, String> {
    store.get_config(key).unwrap().unwrap().data
}

// ── Passes ──────────────────────────────────────────────────────────

#[test]
fn first_pass_writes_both_bundles() {
    let store = memory_store();
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let report = reconciler.reconcile().unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].key, alert_target_key());
    assert_eq!(report.updated_count(), 2);

    let alerts = data_of(store.as_ref(), &alert_target_key());
    assert_eq!(
        alerts.keys().collect::<Vec<_>>(),
        vec!["__cluster1__kubernetes-resources.yaml", "kubernetes-resources.yaml"]
    );
    assert!(alerts["kubernetes-resources.yaml"].contains("expr: default_throttled > 0.25"));
    assert!(alerts["__cluster1__kubernetes-resources.yaml"].contains("expr: cluster1_throttled > 0.42"));
    assert!(alerts["__cluster1__kubernetes-resources.yaml"].contains("for: 10m"));

    let records = data_of(store.as_ref(), &record_target_key());
    assert_eq!(records.len(), 1);
    assert_eq!(records["values"], EXPECTED_REGIONAL1_VALUES);

    let events = reconciler.events().query(
        &alert_target_key().to_string(),
        &EventQuery::default(),
    );
    assert_eq!(events[0].reason, EventReason::OutputUpdated);
}

#[test]
fn second_pass_over_unchanged_inputs_writes_nothing() {
    let store = memory_store();
    let reconciler = Reconciler::new(Arc::clone(&store), release());
    reconciler.reconcile().unwrap();
    let version = store
        .get_config(&alert_target_key())
        .unwrap()
        .unwrap()
        .metadata
        .resource_version;

    let report = reconciler.reconcile().unwrap();
    assert!(report.is_noop());
    assert_eq!(report.count(WriteStatus::Unchanged), 2);
    assert_eq!(
        store
            .get_config(&alert_target_key())
            .unwrap()
            .unwrap()
            .metadata
            .resource_version,
        version
    );
}

#[test]
fn removing_cluster_collection_reverts_to_default_set() {
    let store = memory_store();
    let reconciler = Reconciler::new(Arc::clone(&store), release());
    reconciler.reconcile().unwrap();

    store.remove_config(&ObjectKey::new(NAMESPACE, "record-rules-regional1"));
    let report = reconciler.reconcile().unwrap();
    assert_eq!(report.status_of(&record_target_key()), Some(WriteStatus::Updated));

    let values = &data_of(store.as_ref(), &record_target_key())["values"];
    assert!(values.contains("record: count:default_up1"));
    assert!(!values.contains("child2"));
}

#[test]
fn sources_of_other_releases_are_ignored() {
    let store = memory_store();
    store.insert_rule_source(RuleSourceObject::new(
        ObjectMeta::new(NAMESPACE, "foreign").with_label(RELEASE_NAME_LABEL, "someone-else"),
        serde_yaml::from_str("groups:\n- name: foreign\n  rules:\n  - alert: Foreign\n    expr: up\n").unwrap(),
    ));
    let reconciler = Reconciler::new(Arc::clone(&store), release());
    reconciler.reconcile().unwrap();

    let alerts = data_of(store.as_ref(), &alert_target_key());
    assert!(!alerts.contains_key("foreign.yaml"));
}

#[test]
fn target_without_ownership_marker_is_left_alone() {
    let store = memory_store();
    let mut foreign = store.get_config(&record_target_key()).unwrap().unwrap();
    foreign.metadata.labels.remove(GENERATED_LABEL);
    foreign.data.insert("values".into(), "hand-written\n".into());
    store.insert_config(foreign);

    let reconciler = Reconciler::new(Arc::clone(&store), release());
    let report = reconciler.reconcile().unwrap();
    assert_eq!(report.status_of(&record_target_key()), Some(WriteStatus::NotOwned));
    assert_eq!(report.status_of(&alert_target_key()), Some(WriteStatus::Updated));
    assert_eq!(data_of(store.as_ref(), &record_target_key())["values"], "hand-written\n");

    let events = reconciler.events().query(
        &record_target_key().to_string(),
        &EventQuery {
            reason: Some(EventReason::OutputNotOwned),
            ..Default::default()
        },
    );
    assert_eq!(events.len(), 1);
}

#[test]
fn equal_content_wins_over_missing_marker() {
    let store = memory_store();
    let reconciler = Reconciler::new(Arc::clone(&store), release());
    reconciler.reconcile().unwrap();

    let mut target = store.get_config(&record_target_key()).unwrap().unwrap();
    target.metadata.labels.remove(GENERATED_LABEL);
    store.insert_config(target);

    let report = reconciler.reconcile().unwrap();
    assert_eq!(report.status_of(&record_target_key()), Some(WriteStatus::Unchanged));
}

#[test]
fn malformed_override_aborts_pass_without_writes() {
    let store = memory_store();
    store.insert_config(
        override_collection("record-rules-broken", RECORD_RULES_CLUSTER_LABEL, "")
            .with_data("record-group10", "INVALID YAML: -"),
    );
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let err = reconciler.reconcile().unwrap_err();
    assert!(matches!(err, ReconcileError::Rules(RuleError::Decode { .. })));
    assert!(data_of(store.as_ref(), &alert_target_key()).is_empty());
    assert!(data_of(store.as_ref(), &record_target_key()).is_empty());

    let events = reconciler.events().query("kof/record-rules-broken", &EventQuery::default());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, EventReason::RulesUnmarshalFailed);
    let details = events[0].details.as_ref().unwrap();
    assert_eq!(details["cluster"], "");
    assert_eq!(details["group"], "record-group10");
    assert_eq!(details["rules"], "INVALID YAML: -");
}

#[test]
fn missing_alert_target_is_an_error() {
    let store = memory_store();
    store.remove_config(&alert_target_key());
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let err = reconciler.reconcile().unwrap_err();
    match err {
        ReconcileError::Write { key, source } => {
            assert_eq!(key, alert_target_key());
            assert!(matches!(source, StoreError::NotFound(_)));
        }
        other => panic!("expected write error, got {other:?}"),
    }
}

#[test]
fn no_record_targets_only_alert_bundle_written() {
    let store = memory_store();
    store.remove_config(&record_target_key());
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let report = reconciler.reconcile().unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].key, alert_target_key());
}

// ── Store failures ──────────────────────────────────────────────────

/// Wraps a memory store with injectable listing failures and update conflicts.
struct FlakyStore {
    inner: MemoryObjectStore,
    fail_listing: bool,
    conflicts_left: AtomicU32,
    update_calls: AtomicU32,
}

impl FlakyStore {
    fn new(fail_listing: bool, conflicts: u32) -> Self {
        let inner = MemoryObjectStore::new();
        let (configs, sources) = seed_objects();
        configs.into_iter().for_each(|c| inner.insert_config(c));
        sources.into_iter().for_each(|s| inner.insert_rule_source(s));
        Self {
            inner,
            fail_listing,
            conflicts_left: AtomicU32::new(conflicts),
            update_calls: AtomicU32::new(0),
        }
    }
}

impl ObjectStore for FlakyStore {
    fn list_configs(&self, namespace: Option<&str>, label_key: &str) -> StoreResult<Vec<ConfigObject>> {
        if self.fail_listing && label_key == RECORD_RULES_CLUSTER_LABEL {
            return Err(StoreError::Io(std::io::Error::other("listing unavailable")));
        }
        self.inner.list_configs(namespace, label_key)
    }

    fn list_rule_sources(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<RuleSourceObject>> {
        self.inner.list_rule_sources(namespace, selector)
    }

    fn get_config(&self, key: &ObjectKey) -> StoreResult<Option<ConfigObject>> {
        self.inner.get_config(key)
    }

    fn update_config(&self, object: &ConfigObject) -> StoreResult<ConfigObject> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.conflicts_left.load(Ordering::SeqCst);
        if left > 0 {
            self.conflicts_left.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict {
                key: object.metadata.key(),
                expected: object.metadata.resource_version,
                actual: object.metadata.resource_version + 1,
            });
        }
        self.inner.update_config(object)
    }
}

#[test]
fn listing_failure_aborts_before_any_write() {
    let store = Arc::new(FlakyStore::new(true, 0));
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let err = reconciler.reconcile().unwrap_err();
    assert!(matches!(err, ReconcileError::Listing { .. }));
    assert_eq!(store.update_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn conflicts_are_retried() {
    let store = Arc::new(FlakyStore::new(false, 2));
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let report = reconciler.reconcile().unwrap();
    assert_eq!(report.updated_count(), 2);
    // Two conflicts on the alert target, then one update per target.
    assert_eq!(store.update_calls.load(Ordering::SeqCst), 4);
}

#[test]
fn persistent_conflicts_fail_after_max_attempts() {
    let store = Arc::new(FlakyStore::new(false, 100));
    let reconciler = Reconciler::new(Arc::clone(&store), release());

    let err = reconciler.reconcile().unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Write {
            source: StoreError::Conflict { .. },
            ..
        }
    ));
    assert_eq!(store.update_calls.load(Ordering::SeqCst), 3);

    let events = reconciler.events().query(
        &alert_target_key().to_string(),
        &EventQuery {
            reason: Some(EventReason::OutputUpdateFailed),
            ..Default::default()
        },
    );
    assert_eq!(events.len(), 1);
}

// ── Filesystem store ────────────────────────────────────────────────

#[test]
fn filesystem_store_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FsObjectStore::open(dir.path()).unwrap());
    let (configs, sources) = seed_objects();
    for config in &configs {
        store.create_config(config).unwrap();
    }
    for source in &sources {
        store.create_rule_source(source).unwrap();
    }

    let reconciler = Reconciler::new(Arc::clone(&store), release());
    let first = reconciler.reconcile().unwrap();
    assert_eq!(first.updated_count(), 2);
    assert_eq!(
        data_of(store.as_ref(), &record_target_key())["values"],
        EXPECTED_REGIONAL1_VALUES
    );

    let second = reconciler.reconcile().unwrap();
    assert!(second.is_noop());

    // A fresh driver over the same directory sees the persisted outputs as current.
    let fresh = Reconciler::new(Arc::clone(&store), release());
    assert!(fresh.reconcile().unwrap().is_noop());
}
