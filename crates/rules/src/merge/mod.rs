//! Merge engine: folds ingested, scope-tagged collections into two trees,
//! `scope → group → alert rules` and `scope → group → record rules`.
//!
//! Application order is fixed: base sources, then default-scope overrides,
//! then cluster-scope overrides. Alert overrides patch rule-by-rule; record
//! overrides replace whole groups.

mod alerts;
mod records;
mod tree;


pub use self::alerts::merge_alerts;
pub use self::records::merge_records;
pub use self::tree::{AlertTree, MergeTree, RecordTree};

use crate::ingest::IngestedRules;

/// Both merge trees of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRules {
    pub alerts: AlertTree,
    pub records: RecordTree,
}

/// Run the alert and record merges over the same ingested snapshot.
pub fn merge(ingested: &IngestedRules) -> MergedRules {
    MergedRules {
        alerts: merge_alerts(ingested),
        records: merge_records(ingested),
    }
}
