//! Alert and record rule values and the field-level patch between two rules.

use std::collections::BTreeMap;
use std::fmt;

/// Fields shared by alert and record rules.
///
/// `for_duration` and `keep_firing_for` distinguish "unset" (`None`) from
/// "set to empty" (`Some("")`), which matters for [`patch`](Self::patch).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFields {
    pub expr: String,
    pub for_duration: Option<String>,
    pub keep_firing_for: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl RuleFields {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            ..Default::default()
        }
    }

    pub fn with_for(mut self, duration: impl Into<String>) -> Self {
        self.for_duration = Some(duration.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Overwrite fields of `self` with every field `new` sets.
    ///
    /// - `expr` is replaced when non-empty.
    /// - `for_duration` / `keep_firing_for` are replaced when `Some`.
    /// - `labels` / `annotations` are unioned key-wise, `new` winning; keys
    ///   only present in `self` survive.
    pub fn patch(&mut self, new: &RuleFields) {
        if !new.expr.is_empty() {
            self.expr = new.expr.clone();
        }
        if new.for_duration.is_some() {
            self.for_duration = new.for_duration.clone();
        }
        if new.keep_firing_for.is_some() {
            self.keep_firing_for = new.keep_firing_for.clone();
        }
        self.labels
            .extend(new.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.annotations
            .extend(new.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// By-value variant of [`patch`](Self::patch).
    pub fn patched(mut self, new: &RuleFields) -> Self {
        self.patch(new);
        self
    }
}

/// A single rule: either an alert (keyed by name within its group) or a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Alert { name: String, fields: RuleFields },
    Record { name: String, fields: RuleFields },
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Alert { .. } => RuleKind::Alert,
            Rule::Record { .. } => RuleKind::Record,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::Alert { name, .. } | Rule::Record { name, .. } => name,
        }
    }

    pub fn fields(&self) -> &RuleFields {
        match self {
            Rule::Alert { fields, .. } | Rule::Record { fields, .. } => fields,
        }
    }
}

/// A record rule. Record rules have no identity key: duplicates are allowed
/// and the sequence order of their source is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRule {
    pub record: String,
    pub fields: RuleFields,
}

impl RecordRule {
    pub fn new(record: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            fields: RuleFields::new(expr),
        }
    }
}

/// Alert rules of one group, keyed by alert name.
pub type AlertRules = BTreeMap<String, RuleFields>;

/// Record rules of one group, in source order.
pub type RecordRules = Vec<RecordRule>;

/// The two rule kinds an override collection can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Alert,
    Record,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Alert => write!(f, "alert"),
            RuleKind::Record => write!(f, "record"),
        }
    }
}
