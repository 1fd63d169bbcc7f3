//! Alert-rule bundle.

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RuleError};
use crate::merge::AlertTree;
use crate::model::{AlertRules, RuleGroupSpec, RuleSpec, Scope};

use super::document::OutputDocument;

/// Label added to every emitted alert rule, set to its group name.
pub const ALERT_GROUP_LABEL: &str = "alertgroup";

#[derive(Serialize)]
struct AlertRuleFile {
    groups: Vec<RuleGroupSpec>,
}

/// Entry key for a `(scope, group)` pair: `group.yaml` for the default
/// scope, `__<cluster>__group.yaml` otherwise.
pub fn alert_file_name(scope: &Scope, group: &str) -> String {
    match scope.cluster_name() {
        None => format!("{}.yaml", group),
        Some(cluster) => format!("__{}__{}.yaml", cluster, group),
    }
}

/// Serialize one group as a single-group rule file.
pub fn render_alert_group(scope: &Scope, group: &str, rules: &AlertRules) -> Result<String> {
    // `AlertRules` is name-ordered, so this is already sorted by alert name.
    let specs = rules
        .iter()
        .map(|(name, fields)| {
            let mut spec = RuleSpec::alert(name.as_str(), fields);
            spec.labels
                .insert(ALERT_GROUP_LABEL.to_string(), group.to_string());
            spec
        })
        .collect();

    let file = AlertRuleFile {
        groups: vec![RuleGroupSpec {
            name: group.to_string(),
            rules: specs,
        }],
    };
    serde_yaml::to_string(&file).map_err(|source| RuleError::Serialize {
        what: format!("alert rules of group '{}'", group),
        scope: scope.clone(),
        source,
    })
}

/// Build the alert bundle: one entry per `(scope, group)` of the tree.
pub fn build_alert_bundle(tree: &AlertTree) -> Result<OutputDocument> {
    let mut bundle = OutputDocument::new();
    for (scope, group, rules) in tree.iter() {
        let text = render_alert_group(&scope, group, rules)?;
        bundle.append(alert_file_name(&scope, group), &text);
    }
    debug!(files = bundle.len(), "built alert bundle");
    Ok(bundle)
}
