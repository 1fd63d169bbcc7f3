use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::labels::ALERT_TARGET_SUFFIX;
use crate::meta::ObjectKey;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

/// Full configuration for the reconciler.
///
/// Built from defaults, an optional TOML file and environment overrides,
/// in that order of increasing precedence. The merge engine never reads any
/// of this directly; the driver receives it explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Config {
    /// Build config from environment variables only (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string, then apply environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable numbers are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RELEASE_NAME") {
            self.release.name = v;
        }
        if let Some(v) = lookup("RELEASE_NAMESPACE") {
            self.release.namespace = v;
        }
        if let Some(v) = lookup("RULEFOLD_STORE_DIR") {
            self.store.root = PathBuf::from(v);
        }
        if let Some(ms) = lookup("RULEFOLD_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.watch.debounce_ms = ms;
        }
        if let Some(secs) = lookup("RULEFOLD_RESYNC_SECS").and_then(|v| v.parse().ok()) {
            self.watch.resync_secs = secs;
        }
    }

    // ── Validation ──────────────────────────────────────────────

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.release.name.is_empty() {
            return Err(ConfigError::Missing("RELEASE_NAME"));
        }
        if self.release.namespace.is_empty() {
            return Err(ConfigError::Missing("RELEASE_NAMESPACE"));
        }
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "watch.debounce_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  release:  name={}, namespace={}",
            self.release.name,
            self.release.namespace
        );
        tracing::info!("  store:    root={}", self.store.root.display());
        tracing::info!(
            "  watch:    debounce_ms={}, resync_secs={}",
            self.watch.debounce_ms,
            self.watch.resync_secs
        );
    }
}

// ── Release ───────────────────────────────────────────────────

/// Identity of the deployment whose rules are being reconciled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl ReleaseConfig {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Where the merged alert-rule bundle is written.
    pub fn alert_target(&self) -> ObjectKey {
        ObjectKey::new(
            &self.namespace,
            format!("{}{}", self.name, ALERT_TARGET_SUFFIX),
        )
    }
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding `<namespace>/<name>.yaml` manifests.
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

fn default_store_root() -> PathBuf {
    PathBuf::from("data/objects")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

// ── Watch ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period after a filesystem event before a pass runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Periodic full pass interval; 0 disables it.
    #[serde(default = "default_resync_secs")]
    pub resync_secs: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_resync_secs() -> u64 {
    300
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            resync_secs: default_resync_secs(),
        }
    }
}
