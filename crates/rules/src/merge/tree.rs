//! Two-level `scope → group → G` structure.

use std::collections::BTreeMap;

use crate::model::{AlertRules, RecordRules, Scope};

/// Merge accumulation keyed by scope, then group name.
///
/// The default scope is held apart from the clusters, so it exists (possibly
/// empty) from construction on and cluster lookups can always fall back to it.
/// Iteration order is deterministic: default first, then clusters by name,
/// groups by name within each scope.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeTree<G> {
    default: BTreeMap<String, G>,
    clusters: BTreeMap<String, BTreeMap<String, G>>,
}

pub type AlertTree = MergeTree<AlertRules>;
pub type RecordTree = MergeTree<RecordRules>;

impl<G> MergeTree<G> {
    pub fn new() -> Self {
        Self {
            default: BTreeMap::new(),
            clusters: BTreeMap::new(),
        }
    }

    /// Groups of the default scope.
    pub fn default_groups(&self) -> &BTreeMap<String, G> {
        &self.default
    }

    /// Groups of `scope`, `None` if the cluster has no entry at all.
    pub fn groups(&self, scope: &Scope) -> Option<&BTreeMap<String, G>> {
        match scope {
            Scope::Default => Some(&self.default),
            Scope::Cluster(name) => self.clusters.get(name),
        }
    }

    /// Groups of `scope`, creating the cluster entry if needed.
    pub fn groups_mut(&mut self, scope: &Scope) -> &mut BTreeMap<String, G> {
        match scope {
            Scope::Default => &mut self.default,
            Scope::Cluster(name) => self.clusters.entry(name.clone()).or_default(),
        }
    }

    pub fn group(&self, scope: &Scope, group: &str) -> Option<&G> {
        self.groups(scope).and_then(|groups| groups.get(group))
    }

    /// Replace (or create) a whole group.
    pub fn insert_group(&mut self, scope: &Scope, group: impl Into<String>, value: G) {
        self.groups_mut(scope).insert(group.into(), value);
    }

    /// All scopes with an entry, default first.
    pub fn scopes(&self) -> Vec<Scope> {
        std::iter::once(Scope::Default)
            .chain(self.clusters.keys().map(|c| Scope::cluster(c.as_str())))
            .collect()
    }

    /// Every `(scope, group name, group)` triple, default scope first.
    pub fn iter(&self) -> impl Iterator<Item = (Scope, &str, &G)> {
        let defaults = self
            .default
            .iter()
            .map(|(name, g)| (Scope::Default, name.as_str(), g));
        let clusters = self.clusters.iter().flat_map(|(cluster, groups)| {
            groups
                .iter()
                .map(move |(name, g)| (Scope::cluster(cluster.as_str()), name.as_str(), g))
        });
        defaults.chain(clusters)
    }

    /// The group set a cluster resolves to: every default group, with each
    /// group the cluster defines replacing the default group of that name
    /// wholesale.
    pub fn resolve(&self, scope: &Scope) -> BTreeMap<&str, &G> {
        let mut resolved: BTreeMap<&str, &G> = self
            .default
            .iter()
            .map(|(name, g)| (name.as_str(), g))
            .collect();
        if let Some(Some(groups)) = scope.cluster_name().map(|c| self.clusters.get(c)) {
            resolved.extend(groups.iter().map(|(name, g)| (name.as_str(), g)));
        }
        resolved
    }
}

impl<G: Default> MergeTree<G> {
    /// The `(scope, group)` accumulation, created empty if absent.
    pub fn group_mut(&mut self, scope: &Scope, group: &str) -> &mut G {
        self.groups_mut(scope).entry(group.to_string()).or_default()
    }
}

impl<G> Default for MergeTree<G> {
    fn default() -> Self {
        Self::new()
    }
}
