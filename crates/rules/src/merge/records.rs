//! Record-rule merge: group-granularity replacement.

use tracing::debug;

use crate::ingest::IngestedRules;
use crate::model::{RecordRule, Rule, Scope};

use super::tree::RecordTree;

/// Fold base sources and record override collections into `scope → group → [rule]`.
///
/// Base record rules are appended to the default group in source order. An
/// override collection replaces the `(scope, group)` entry wholesale; later
/// collections for the same scope and group win.
pub fn merge_records(ingested: &IngestedRules) -> RecordTree {
    let mut tree = RecordTree::new();

    for base in &ingested.base {
        for group in &base.groups {
            let records: Vec<RecordRule> = group
                .rules
                .iter()
                .filter_map(|rule| match rule {
                    Rule::Record { name, fields } => Some(RecordRule {
                        record: name.clone(),
                        fields: fields.clone(),
                    }),
                    Rule::Alert { .. } => None,
                })
                .collect();
            if !records.is_empty() {
                tree.group_mut(&Scope::Default, &group.name).extend(records);
            }
        }
        debug!(source = %base.source, "merged base record rules");
    }

    for overrides in &ingested.records {
        for (group, rules) in &overrides.groups {
            tree.insert_group(&overrides.scope, group.as_str(), rules.clone());
        }
        debug!(source = %overrides.source, scope = %overrides.scope, groups = overrides.groups.len(), "applied record overrides");
    }

    tree
}
