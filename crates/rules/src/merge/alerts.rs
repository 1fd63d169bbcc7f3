//! Alert-rule precedence merge.

use tracing::debug;

use crate::ingest::{AlertOverrides, BaseRules, IngestedRules};
use crate::model::{Rule, RuleFields, Scope};

use super::tree::AlertTree;

/// Fold base sources and alert override collections into `scope → group → name → rule`.
pub fn merge_alerts(ingested: &IngestedRules) -> AlertTree {
    let mut tree = AlertTree::new();
    for base in &ingested.base {
        merge_base(&mut tree, base);
    }
    for overrides in &ingested.alerts {
        apply_overrides(&mut tree, overrides);
    }
    tree
}

/// Seed the default scope. A later rule with the same name replaces the
/// earlier one outright.
fn merge_base(tree: &mut AlertTree, base: &BaseRules) {
    for group in &base.groups {
        let mut alerts = group.rules.iter().filter_map(|rule| match rule {
            Rule::Alert { name, fields } => Some((name, fields)),
            Rule::Record { .. } => None,
        });
        // Groups without alerts leave no trace in the alert tree.
        let Some(first) = alerts.next() else {
            continue;
        };

        let rules = tree.group_mut(&Scope::Default, &group.name);
        for (name, fields) in std::iter::once(first).chain(alerts) {
            let mut fields = fields.clone();
            // Downstream rule loader rejects `keep_firing_for`.
            fields.keep_firing_for = None;
            rules.insert(name.clone(), fields);
        }
    }
    debug!(source = %base.source, groups = base.groups.len(), "merged base alert rules");
}

fn apply_overrides(tree: &mut AlertTree, overrides: &AlertOverrides) {
    let scope = &overrides.scope;
    for (group, rules) in &overrides.groups {
        // The group exists for this scope even if the payload defines no rules.
        tree.group_mut(scope, group);
        for (name, new) in rules {
            apply_override(tree, scope, group, name, new);
        }
    }
    debug!(source = %overrides.source, scope = %scope, groups = overrides.groups.len(), "applied alert overrides");
}

/// Apply one override rule:
///
/// 1. name already in this scope's accumulation → patch it in place;
/// 2. cluster scope and name in the default accumulation → patch a copy of
///    the default rule and store it under the cluster;
/// 3. otherwise → store the override as is.
fn apply_override(tree: &mut AlertTree, scope: &Scope, group: &str, name: &str, new: &RuleFields) {
    let already_present = tree
        .group(scope, group)
        .is_some_and(|rules| rules.contains_key(name));

    // Owned copy: patching the cluster rule must never reach the default one.
    let inherited = if !already_present && !scope.is_default() {
        tree.group(&Scope::Default, group)
            .and_then(|rules| rules.get(name))
            .cloned()
    } else {
        None
    };

    let rules = tree.group_mut(scope, group);
    if let Some(existing) = rules.get_mut(name) {
        existing.patch(new);
        return;
    }
    let rule = match inherited {
        Some(default_rule) => default_rule.patched(new),
        None => new.clone(),
    };
    rules.insert(name.to_string(), rule);
}
