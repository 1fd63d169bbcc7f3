//! Payload decoding for override collections.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, RuleError};
use crate::model::{AlertRules, RecordRules, RuleKind, RuleSpec, Scope};

use super::collection::{
    AlertOverrides, BaseRuleGroup, BaseRules, BaseSource, IngestedRules, OverrideCollection,
    RawInputs, RecordOverrides,
};

/// Decode every input of a pass. Fails on the first malformed group.
pub fn ingest(raw: &RawInputs) -> Result<IngestedRules> {
    let base = raw.base_sources.iter().map(classify_base).collect();

    let mut alerts = Vec::new();
    let mut records = Vec::new();
    for collection in default_first(&raw.overrides) {
        match collection.kind {
            RuleKind::Alert => alerts.push(decode_alert_collection(collection)?),
            RuleKind::Record => records.push(decode_record_collection(collection)?),
        }
    }

    debug!(
        base = raw.base_sources.len(),
        alert_collections = alerts.len(),
        record_collections = records.len(),
        "ingested rule inputs"
    );

    Ok(IngestedRules {
        base,
        alerts,
        records,
    })
}

/// Stable partition: default-scope collections first, listing order kept within each half.
fn default_first(collections: &[OverrideCollection]) -> impl Iterator<Item = &OverrideCollection> {
    let defaults = collections.iter().filter(|c| c.scope.is_default());
    let clusters = collections.iter().filter(|c| !c.scope.is_default());
    defaults.chain(clusters)
}

fn classify_base(source: &BaseSource) -> BaseRules {
    let groups = source
        .spec
        .groups
        .iter()
        .map(|group| BaseRuleGroup {
            name: group.name.clone(),
            rules: group
                .rules
                .iter()
                .cloned()
                .flat_map(RuleSpec::into_rules)
                .collect(),
        })
        .collect();
    BaseRules {
        source: source.name.clone(),
        groups,
    }
}

fn decode_alert_collection(collection: &OverrideCollection) -> Result<AlertOverrides> {
    let mut groups = BTreeMap::new();
    for (group, payload) in &collection.data {
        let rules = decode_alert_payload(&collection.name, &collection.scope, group, payload)?;
        groups.insert(group.clone(), rules);
    }
    Ok(AlertOverrides {
        source: collection.name.clone(),
        scope: collection.scope.clone(),
        groups,
    })
}

fn decode_record_collection(collection: &OverrideCollection) -> Result<RecordOverrides> {
    let mut groups = BTreeMap::new();
    for (group, payload) in &collection.data {
        let rules = decode_record_payload(&collection.name, &collection.scope, group, payload)?;
        groups.insert(group.clone(), rules);
    }
    Ok(RecordOverrides {
        source: collection.name.clone(),
        scope: collection.scope.clone(),
        groups,
    })
}

/// Decode an alert payload: a mapping `alertName → rule fields`.
///
/// Any `alert:` field inside a rule body is ignored; the mapping key is the name.
pub fn decode_alert_payload(
    collection: &str,
    scope: &Scope,
    group: &str,
    payload: &str,
) -> Result<AlertRules> {
    let specs: BTreeMap<String, RuleSpec> =
        decode_payload(collection, RuleKind::Alert, scope, group, payload)?;
    Ok(specs
        .into_iter()
        .map(|(name, spec)| (name, spec.into_fields()))
        .collect())
}

/// Decode a record payload: an ordered list of `{expr, record}`.
pub fn decode_record_payload(
    collection: &str,
    scope: &Scope,
    group: &str,
    payload: &str,
) -> Result<RecordRules> {
    let specs: Vec<RuleSpec> =
        decode_payload(collection, RuleKind::Record, scope, group, payload)?;
    Ok(specs.into_iter().map(Into::into).collect())
}

/// An empty (or `null`) document decodes to an empty collection.
fn decode_payload<T: DeserializeOwned + Default>(
    collection: &str,
    kind: RuleKind,
    scope: &Scope,
    group: &str,
    payload: &str,
) -> Result<T> {
    if payload.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str::<Option<T>>(payload)
        .map(Option::unwrap_or_default)
        .map_err(|source| RuleError::Decode {
            collection: collection.to_string(),
            kind,
            scope: scope.clone(),
            group: group.to_string(),
            payload: payload.to_string(),
            source,
        })
}
