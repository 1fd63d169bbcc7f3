//! Serialized rule shape shared by base sources, override payloads and outputs.
//!
//! Field order follows the downstream consumer's canonical (alphabetical) key
//! order, so serializing a `RuleSpec` yields the same bytes every time.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{RecordRule, Rule, RuleFields};

/// One rule as written in YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alert: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_expr")]
    pub expr: String,
    #[serde(default, rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_firing_for: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub record: String,
}

impl RuleSpec {
    pub fn alert(name: impl Into<String>, fields: &RuleFields) -> Self {
        Self {
            alert: name.into(),
            ..Self::from_fields(fields)
        }
    }

    pub fn record(rule: &RecordRule) -> Self {
        Self {
            record: rule.record.clone(),
            ..Self::from_fields(&rule.fields)
        }
    }

    fn from_fields(fields: &RuleFields) -> Self {
        Self {
            annotations: fields.annotations.clone(),
            expr: fields.expr.clone(),
            for_duration: fields.for_duration.clone(),
            keep_firing_for: fields.keep_firing_for.clone(),
            labels: fields.labels.clone(),
            ..Default::default()
        }
    }

    /// Split off the shared fields, dropping `alert` / `record`.
    pub fn into_fields(self) -> RuleFields {
        RuleFields {
            expr: self.expr,
            for_duration: self.for_duration,
            keep_firing_for: self.keep_firing_for,
            labels: self.labels,
            annotations: self.annotations,
        }
    }

    /// Classify by which names are set. A spec naming both `alert` and
    /// `record` yields both rules (alert first); one naming neither yields none.
    pub fn into_rules(self) -> Vec<Rule> {
        let mut rules = Vec::with_capacity(1);
        if !self.alert.is_empty() {
            rules.push(Rule::Alert {
                name: self.alert.clone(),
                fields: self.clone().into_fields(),
            });
        }
        if !self.record.is_empty() {
            let name = self.record.clone();
            rules.push(Rule::Record {
                name,
                fields: self.into_fields(),
            });
        }
        rules
    }
}

impl From<RuleSpec> for RecordRule {
    fn from(spec: RuleSpec) -> Self {
        let record = spec.record.clone();
        RecordRule {
            record,
            fields: spec.into_fields(),
        }
    }
}

/// A named group of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleGroupSpec {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Body of a base rule source: an ordered list of rule groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSourceSpec {
    #[serde(default)]
    pub groups: Vec<RuleGroupSpec>,
}

/// `expr` may be written as a YAML string or number; it is carried as text.
fn deserialize_expr<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Float(f64),
        Str(String),
    }

    Ok(match Option::<IntOrString>::deserialize(deserializer)? {
        Some(IntOrString::Int(i)) => i.to_string(),
        Some(IntOrString::Float(f)) => f.to_string(),
        Some(IntOrString::Str(s)) => s,
        None => String::new(),
    })
}
