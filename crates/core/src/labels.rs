//! Well-known label keys shared by input collections and output targets.

/// Marks an alert override collection. Value `""` is the default scope,
/// anything else names the cluster the overrides apply to.
pub const ALERT_RULES_CLUSTER_LABEL: &str = "k0rdent.mirantis.com/kof-alert-rules-cluster-name";

/// Marks a record override collection. Same value convention as
/// [`ALERT_RULES_CLUSTER_LABEL`].
pub const RECORD_RULES_CLUSTER_LABEL: &str = "k0rdent.mirantis.com/kof-record-rules-cluster-name";

/// Marks a record output target; the value is the cluster it is rendered for.
pub const RECORD_VMRULES_CLUSTER_LABEL: &str =
    "k0rdent.mirantis.com/kof-record-vmrules-cluster-name";

/// Ownership marker carried by every output target this system may overwrite.
pub const GENERATED_LABEL: &str = "k0rdent.mirantis.com/kof-generated";

/// Value of [`GENERATED_LABEL`] on owned targets.
pub const GENERATED_VALUE: &str = "true";

/// Selects the base rule sources belonging to a release.
pub const RELEASE_NAME_LABEL: &str = "app.kubernetes.io/instance";

/// Suffix appended to the release name to form the alert output target name.
pub const ALERT_TARGET_SUFFIX: &str = "-promxy-rules";
