//! Per-cluster record-rule bundle.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RuleError};
use crate::merge::RecordTree;
use crate::model::{RecordRules, RuleSpec, Scope};

use super::document::OutputDocument;

/// The single key of a record bundle. Nothing else is ever emitted at the top level.
pub const RECORD_VALUES_KEY: &str = "values";

#[derive(Serialize)]
struct RecordValues<'a> {
    vmrules: VmRules<'a>,
}

#[derive(Serialize)]
struct VmRules<'a> {
    groups: BTreeMap<&'a str, Vec<RuleSpec>>,
}

/// Serialize a resolved group set as `vmrules: { groups: ... }`.
pub fn render_record_values(groups: &BTreeMap<&str, &RecordRules>) -> serde_yaml::Result<String> {
    let groups = groups
        .iter()
        .map(|(name, rules)| (*name, rules.iter().map(RuleSpec::record).collect()))
        .collect();
    serde_yaml::to_string(&RecordValues {
        vmrules: VmRules { groups },
    })
}

/// Build the record bundle for `cluster`: every default group, with the
/// cluster's own groups replacing default groups of the same name.
pub fn build_record_bundle(tree: &RecordTree, cluster: &Scope) -> Result<OutputDocument> {
    let resolved = tree.resolve(cluster);
    let text = render_record_values(&resolved).map_err(|source| RuleError::Serialize {
        what: "record rules".to_string(),
        scope: cluster.clone(),
        source,
    })?;

    let mut bundle = OutputDocument::new();
    bundle.append(RECORD_VALUES_KEY, &text);
    debug!(cluster = %cluster, groups = resolved.len(), "built record bundle");
    Ok(bundle)
}
