//! YAML manifests for stored objects.
//!
//! Decoding is two-pass: [`ManifestEnvelope`] reads only `kind` and
//! `metadata`, then [`ManifestEnvelope::parse_full`] reconstructs the YAML and
//! deserializes it into the kind-specific type.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use rulefold_core::ObjectMeta;
use rulefold_rules::model::RuleSourceSpec;

/// Supported manifest kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    ConfigMap,
    PrometheusRule,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::ConfigMap => write!(f, "ConfigMap"),
            ManifestKind::PrometheusRule => write!(f, "PrometheusRule"),
        }
    }
}

impl FromStr for ManifestKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ConfigMap" => Ok(ManifestKind::ConfigMap),
            "PrometheusRule" => Ok(ManifestKind::PrometheusRule),
            other => Err(format!("unknown manifest kind: '{}'", other)),
        }
    }
}

fn config_api_version() -> String {
    "v1".into()
}

fn config_kind() -> String {
    ManifestKind::ConfigMap.to_string()
}

fn rule_source_api_version() -> String {
    "monitoring.coreos.com/v1".into()
}

fn rule_source_kind() -> String {
    ManifestKind::PrometheusRule.to_string()
}

/// A labeled string map: override collections and output targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigObject {
    #[serde(rename = "apiVersion", default = "config_api_version")]
    pub api_version: String,
    #[serde(default = "config_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: config_api_version(),
            kind: config_kind(),
            metadata,
            data: BTreeMap::new(),
        }
    }

    /// Builder-style data insertion.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A base rule source: a list of named rule groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSourceObject {
    #[serde(rename = "apiVersion", default = "rule_source_api_version")]
    pub api_version: String,
    #[serde(default = "rule_source_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RuleSourceSpec,
}

impl RuleSourceObject {
    pub fn new(metadata: ObjectMeta, spec: RuleSourceSpec) -> Self {
        Self {
            api_version: rule_source_api_version(),
            kind: rule_source_kind(),
            metadata,
            spec,
        }
    }
}

/// A fully decoded manifest of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    Config(ConfigObject),
    RuleSource(RuleSourceObject),
}

impl Manifest {
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Manifest::Config(obj) => &obj.metadata,
            Manifest::RuleSource(obj) => &obj.metadata,
        }
    }

    pub fn kind(&self) -> ManifestKind {
        match self {
            Manifest::Config(_) => ManifestKind::ConfigMap,
            Manifest::RuleSource(_) => ManifestKind::PrometheusRule,
        }
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        match self {
            Manifest::Config(obj) => serde_yaml::to_string(obj),
            Manifest::RuleSource(obj) => serde_yaml::to_string(obj),
        }
    }
}

/// First-pass header: `kind` and `metadata`, everything else kept raw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEnvelope {
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl ManifestEnvelope {
    pub fn manifest_kind(&self) -> std::result::Result<ManifestKind, String> {
        self.kind.parse()
    }

    /// Second pass: reconstruct the full YAML and deserialize into the concrete type.
    pub fn parse_full(&self) -> std::result::Result<Manifest, serde_yaml::Error> {
        let value = serde_yaml::to_value(self)?;
        match self.manifest_kind() {
            Ok(ManifestKind::ConfigMap) => Ok(Manifest::Config(serde_yaml::from_value(value)?)),
            Ok(ManifestKind::PrometheusRule) => {
                Ok(Manifest::RuleSource(serde_yaml::from_value(value)?))
            }
            Err(msg) => Err(serde::de::Error::custom(msg)),
        }
    }
}

/// Decode a manifest document.
///
/// Returns `Ok(None)` for kinds this system does not handle.
pub fn parse_manifest(contents: &str) -> std::result::Result<Option<Manifest>, serde_yaml::Error> {
    let envelope: ManifestEnvelope = serde_yaml::from_str(contents)?;
    if envelope.manifest_kind().is_err() {
        return Ok(None);
    }
    envelope.parse_full().map(Some)
}
