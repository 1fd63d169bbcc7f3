//! Tests for rule model types.

use super::*;

fn cpu_rule() -> RuleFields {
    RuleFields::new("rate(cpu[5m]) > 0.9")
        .with_for("5m")
        .with_label("severity", "warning")
        .with_label("team", "infra")
        .with_annotation("summary", "CPU is hot")
}

// ── patch ───────────────────────────────────────────────────

#[test]
fn patch_expr_only_keeps_everything_else() {
    let mut old = cpu_rule();
    old.patch(&RuleFields::new("rate(cpu[5m]) > 0.5"));

    assert_eq!(old.expr, "rate(cpu[5m]) > 0.5");
    assert_eq!(old.for_duration.as_deref(), Some("5m"));
    assert_eq!(old.labels, cpu_rule().labels);
    assert_eq!(old.annotations, cpu_rule().annotations);
}

#[test]
fn patch_empty_expr_is_ignored() {
    let mut old = cpu_rule();
    old.patch(&RuleFields::default().with_for("10m"));
    assert_eq!(old.expr, "rate(cpu[5m]) > 0.9");
    assert_eq!(old.for_duration.as_deref(), Some("10m"));
}

#[test]
fn patch_set_to_empty_duration_overrides() {
    let mut old = cpu_rule();
    let new = RuleFields {
        for_duration: Some(String::new()),
        keep_firing_for: Some("1m".into()),
        ..Default::default()
    };
    old.patch(&new);
    assert_eq!(old.for_duration.as_deref(), Some(""));
    assert_eq!(old.keep_firing_for.as_deref(), Some("1m"));
}

#[test]
fn patch_labels_union_overwrite() {
    let mut old = cpu_rule();
    let new = RuleFields::default()
        .with_label("severity", "critical")
        .with_label("cluster", "c1")
        .with_annotation("runbook_url", "https://runbooks/cpu");
    old.patch(&new);

    assert_eq!(old.labels.len(), 3);
    assert_eq!(old.labels["severity"], "critical");
    assert_eq!(old.labels["team"], "infra");
    assert_eq!(old.labels["cluster"], "c1");
    assert_eq!(old.annotations.len(), 2);
    assert_eq!(old.annotations["summary"], "CPU is hot");
}

#[test]
fn patched_leaves_source_untouched() {
    let base = cpu_rule();
    let out = base.clone().patched(&RuleFields::new("up == 0"));
    assert_eq!(base, cpu_rule());
    assert_eq!(out.expr, "up == 0");
}

// ── scope ───────────────────────────────────────────────────

#[test]
fn scope_from_label() {
    assert_eq!(Scope::from_label(""), Scope::Default);
    assert_eq!(Scope::from_label("regional1"), Scope::cluster("regional1"));
    assert_eq!(Scope::cluster("x").label_value(), "x");
    assert_eq!(Scope::Default.label_value(), "");
    assert!(Scope::Default.cluster_name().is_none());
}

#[test]
fn default_scope_orders_first() {
    let mut scopes = vec![Scope::cluster("b"), Scope::Default, Scope::cluster("a")];
    scopes.sort();
    assert_eq!(scopes, vec![Scope::Default, Scope::cluster("a"), Scope::cluster("b")]);
}

#[test]
fn rule_kind_display() {
    assert_eq!(RuleKind::Alert.to_string(), "alert");
    assert_eq!(RuleKind::Record.to_string(), "record");
}

// ── wire ────────────────────────────────────────────────────

#[test]
fn classify_alert_and_record() {
    let group: RuleGroupSpec = serde_yaml::from_str(
        r#"
name: node
rules:
  - record: instance:up:sum
    expr: sum(up)
  - alert: NodeDown
    expr: up == 0
    for: 5m
    keep_firing_for: 10m
    labels:
      severity: critical
  - expr: orphan
"#,
    )
    .unwrap();

    let rules: Vec<Rule> = group.rules.into_iter().flat_map(RuleSpec::into_rules).collect();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].kind(), RuleKind::Record);
    assert_eq!(rules[0].name(), "instance:up:sum");
    assert_eq!(rules[1].kind(), RuleKind::Alert);
    assert_eq!(rules[1].name(), "NodeDown");
    assert_eq!(rules[1].fields().keep_firing_for.as_deref(), Some("10m"));
    assert_eq!(rules[1].fields().labels["severity"], "critical");
}

#[test]
fn numeric_expr_is_accepted() {
    let spec: RuleSpec = serde_yaml::from_str("record: one\nexpr: 1\n").unwrap();
    assert_eq!(spec.expr, "1");

    let spec: RuleSpec = serde_yaml::from_str("record: quoted\nexpr: \"1\"\n").unwrap();
    assert_eq!(spec.expr, "1");

    let spec: RuleSpec = serde_yaml::from_str("for: 10m\n").unwrap();
    assert_eq!(spec.expr, "");
    assert_eq!(spec.for_duration.as_deref(), Some("10m"));
}

#[test]
fn alert_spec_serializes_in_key_order() {
    let fields = RuleFields::new("up == 0")
        .with_for("10m")
        .with_label("severity", "info")
        .with_label("alertgroup", "g");
    let yaml = serde_yaml::to_string(&RuleSpec::alert("A", &fields)).unwrap();
    assert_eq!(
        yaml,
        "alert: A\nexpr: up == 0\nfor: 10m\nlabels:\n  alertgroup: g\n  severity: info\n"
    );
}

#[test]
fn record_spec_omits_empty_fields() {
    let yaml = serde_yaml::to_string(&RuleSpec::record(&RecordRule::new("count:up", "count(up)")))
        .unwrap();
    assert_eq!(yaml, "expr: count(up)\nrecord: count:up\n");
}
