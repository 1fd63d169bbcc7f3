//! Configuration scope: the default baseline or one named cluster.

use std::fmt;

/// Scope a rule collection (or a branch of the merge tree) belongs to.
///
/// `Default` orders before every `Cluster`, so ordered maps keyed by scope
/// always visit the baseline first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Default,
    Cluster(String),
}

impl Scope {
    /// Interpret a cluster-name label value. The empty string is the default scope.
    pub fn from_label(value: &str) -> Self {
        if value.is_empty() {
            Scope::Default
        } else {
            Scope::Cluster(value.to_string())
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Scope::Cluster(name.into())
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Scope::Default)
    }

    /// Cluster identifier, `None` for the default scope.
    pub fn cluster_name(&self) -> Option<&str> {
        match self {
            Scope::Default => None,
            Scope::Cluster(name) => Some(name),
        }
    }

    /// Inverse of [`Scope::from_label`].
    pub fn label_value(&self) -> &str {
        self.cluster_name().unwrap_or("")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => write!(f, "(default)"),
            Scope::Cluster(name) => write!(f, "{}", name),
        }
    }
}
