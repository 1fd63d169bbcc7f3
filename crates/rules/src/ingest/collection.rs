//! Raw and typed input collections.

use std::collections::BTreeMap;

use crate::model::{AlertRules, RecordRules, Rule, RuleKind, RuleSourceSpec, Scope};

// ── Raw inputs ──────────────────────────────────────────────────────

/// A base rule source, always applied to the default scope.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSource {
    /// Origin identifier, used in logs only.
    pub name: String,
    pub spec: RuleSourceSpec,
}

/// A labeled override blob: group name → serialized rule list.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideCollection {
    /// Origin identifier, used in logs and errors.
    pub name: String,
    pub kind: RuleKind,
    pub scope: Scope,
    pub data: BTreeMap<String, String>,
}

impl OverrideCollection {
    pub fn new(name: impl Into<String>, kind: RuleKind, scope: Scope) -> Self {
        Self {
            name: name.into(),
            kind,
            scope,
            data: BTreeMap::new(),
        }
    }

    /// Builder-style group insertion.
    pub fn with_group(mut self, group: impl Into<String>, rules_yaml: impl Into<String>) -> Self {
        self.data.insert(group.into(), rules_yaml.into());
        self
    }
}

/// Snapshot of every input of one reconciliation pass, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInputs {
    pub base_sources: Vec<BaseSource>,
    pub overrides: Vec<OverrideCollection>,
}

// ── Typed collections ───────────────────────────────────────────────

/// One group of a base source, alert and record rules interleaved as written.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseRuleGroup {
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseRules {
    pub source: String,
    pub groups: Vec<BaseRuleGroup>,
}

/// Decoded alert override collection.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertOverrides {
    pub source: String,
    pub scope: Scope,
    pub groups: BTreeMap<String, AlertRules>,
}

/// Decoded record override collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOverrides {
    pub source: String,
    pub scope: Scope,
    pub groups: BTreeMap<String, RecordRules>,
}

/// Output of [`ingest`](super::ingest), ready for the merge engine.
///
/// Within `alerts` and within `records`, every default-scope collection
/// precedes every cluster-scope one; otherwise listing order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestedRules {
    pub base: Vec<BaseRules>,
    pub alerts: Vec<AlertOverrides>,
    pub records: Vec<RecordOverrides>,
}
