//! Output builder: projects merge trees into the documents written downstream.
//!
//! - Alert bundle: one `<group>.yaml` / `__<cluster>__<group>.yaml` entry per
//!   `(scope, group)`, rules sorted by alert name, `alertgroup` label injected.
//! - Record bundle: one document per target cluster under the single
//!   `values` key, shaped `vmrules: { groups: { <group>: [...] } }`.
//!
//! All maps are ordered, so identical trees always serialize to identical bytes.

mod alerts;
mod document;
mod records;


pub use self::alerts::{alert_file_name, build_alert_bundle, render_alert_group, ALERT_GROUP_LABEL};
pub use self::document::OutputDocument;
pub use self::records::{build_record_bundle, render_record_values, RECORD_VALUES_KEY};
