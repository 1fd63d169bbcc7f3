//! Filesystem-backed object store: `<root>/<namespace>/<name>.yaml`.
//!
//! New objects are created at that canonical path. Existing manifests may live
//! under any `*.yaml`/`*.yml` file name and are updated in place.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use rulefold_core::ObjectKey;

use super::{check_version, in_namespace, ObjectStore, StoreResult};
use crate::error::StoreError;
use crate::manifest::{parse_manifest, ConfigObject, Manifest, ManifestKind, RuleSourceObject};

/// Content of every manifest this store wrote, by path.
///
/// Lets a watcher tell the store's own writes from outside edits: a path whose
/// current content equals what was last written here is unchanged since.
#[derive(Clone, Default)]
pub struct WriteJournal {
    written: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl WriteJournal {
    fn record(&self, path: &Path, contents: String) {
        self.written
            .lock()
            .expect("write journal poisoned")
            .insert(path.to_path_buf(), contents);
    }

    /// Whether `path` still holds exactly what this store last wrote to it.
    pub fn is_own_write(&self, path: &Path) -> bool {
        let guard = self.written.lock().expect("write journal poisoned");
        let Some(expected) = guard.get(path) else {
            return false;
        };
        fs::read_to_string(path).is_ok_and(|actual| &actual == expected)
    }
}

/// A decoded manifest and the file it came from.
struct Located {
    path: PathBuf,
    manifest: Manifest,
}

/// Object store over a directory tree of YAML manifests.
///
/// Files are read fresh on every call; nothing is cached between passes.
/// Writes go to a dotfile first and are renamed into place.
pub struct FsObjectStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    journal: WriteJournal,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        // Watcher events carry absolute paths; journal entries must match them.
        let root = fs::canonicalize(&root)?;
        info!(path = %root.display(), "opened object store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            journal: WriteJournal::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical path for a new object with `key`.
    pub fn object_path(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(&key.namespace).join(format!("{}.yaml", key.name))
    }

    /// Handle for telling this store's writes apart from outside edits.
    pub fn journal(&self) -> WriteJournal {
        self.journal.clone()
    }

    /// Write a config object unconditionally (creating or replacing it).
    pub fn create_config(&self, object: &ConfigObject) -> StoreResult<PathBuf> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        self.create(Manifest::Config(object.clone()))
    }

    /// Write a rule source unconditionally (creating or replacing it).
    pub fn create_rule_source(&self, object: &RuleSourceObject) -> StoreResult<PathBuf> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        self.create(Manifest::RuleSource(object.clone()))
    }

    /// Replace the existing manifest for the key in place, else create it.
    fn create(&self, manifest: Manifest) -> StoreResult<PathBuf> {
        let key = manifest.metadata().key();
        let path = match self.locate(manifest.kind(), &key)? {
            Some(found) => found.path,
            None => self.object_path(&key),
        };
        self.write_manifest(&path, &manifest)?;
        Ok(path)
    }

    fn write_manifest(&self, path: &Path, manifest: &Manifest) -> StoreResult<()> {
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let tmp_path = dir.join(format!(".{}.tmp", file_name));

        let yaml = manifest.to_yaml().map_err(StoreError::Encode)?;
        fs::write(&tmp_path, &yaml)?;
        fs::rename(&tmp_path, path)?;
        self.journal.record(path, yaml);

        debug!(key = %manifest.metadata().key(), kind = %manifest.kind(), path = %path.display(), "wrote manifest");
        Ok(())
    }

    /// The manifest of `kind` keyed `key`, wherever it is stored.
    fn locate(&self, kind: ManifestKind, key: &ObjectKey) -> StoreResult<Option<Located>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|found| found.manifest.kind() == kind && &found.manifest.metadata().key() == key))
    }

    /// Every manifest under the root, in path order.
    ///
    /// A file that fails to decode, or a second file claiming a key already
    /// seen for the same kind, fails the whole listing.
    fn load_all(&self) -> StoreResult<Vec<Located>> {
        let mut manifests: Vec<Located> = Vec::new();
        let mut seen: HashMap<(ManifestKind, ObjectKey), PathBuf> = HashMap::new();
        for ns_dir in sorted_entries(&self.root)? {
            if !ns_dir.is_dir() || is_hidden(&ns_dir) {
                continue;
            }
            let namespace = ns_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            for path in sorted_entries(&ns_dir)? {
                if !path.is_file() || !is_manifest_path(&path) {
                    continue;
                }
                let Some(manifest) = read_manifest(&path, &namespace)? else {
                    continue;
                };
                let key = manifest.metadata().key();
                if let Some(first) = seen.insert((manifest.kind(), key.clone()), path.clone()) {
                    return Err(StoreError::DuplicateKey {
                        key,
                        first,
                        second: path,
                    });
                }
                manifests.push(Located { path, manifest });
            }
        }
        Ok(manifests)
    }
}

/// Whether `path` names a YAML manifest this store reads (dotfiles excluded).
pub fn is_manifest_path(path: &Path) -> bool {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false);
    is_yaml && !is_hidden(path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

/// Decode one manifest file. The directory name fills in a missing namespace.
fn read_manifest(path: &Path, namespace: &str) -> StoreResult<Option<Manifest>> {
    let contents = fs::read_to_string(path)?;
    let manifest = parse_manifest(&contents).map_err(|source| StoreError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(mut manifest) = manifest else {
        debug!(path = %path.display(), "skipping manifest of unhandled kind");
        return Ok(None);
    };

    let meta = match &mut manifest {
        Manifest::Config(obj) => &mut obj.metadata,
        Manifest::RuleSource(obj) => &mut obj.metadata,
    };
    if meta.namespace.is_empty() {
        meta.namespace = namespace.to_string();
    }
    Ok(Some(manifest))
}

impl ObjectStore for FsObjectStore {
    fn list_configs(&self, namespace: Option<&str>, label_key: &str) -> StoreResult<Vec<ConfigObject>> {
        let mut configs: Vec<ConfigObject> = self
            .load_all()?
            .into_iter()
            .filter_map(|found| match found.manifest {
                Manifest::Config(obj) => Some(obj),
                Manifest::RuleSource(_) => None,
            })
            .filter(|obj| in_namespace(namespace, &obj.metadata.namespace))
            .filter(|obj| obj.metadata.has_label(label_key))
            .collect();
        configs.sort_by_key(|obj| obj.metadata.key());
        Ok(configs)
    }

    fn list_rule_sources(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<RuleSourceObject>> {
        let mut sources: Vec<RuleSourceObject> = self
            .load_all()?
            .into_iter()
            .filter_map(|found| match found.manifest {
                Manifest::RuleSource(obj) => Some(obj),
                Manifest::Config(_) => None,
            })
            .filter(|obj| obj.metadata.namespace == namespace)
            .filter(|obj| obj.metadata.matches_labels(selector))
            .collect();
        sources.sort_by_key(|obj| obj.metadata.key());
        Ok(sources)
    }

    fn get_config(&self, key: &ObjectKey) -> StoreResult<Option<ConfigObject>> {
        match self.locate(ManifestKind::ConfigMap, key)? {
            Some(Located {
                manifest: Manifest::Config(obj),
                ..
            }) => Ok(Some(obj)),
            _ => Ok(None),
        }
    }

    fn update_config(&self, object: &ConfigObject) -> StoreResult<ConfigObject> {
        let key = object.metadata.key();
        let _guard = self.write_lock.lock().expect("write lock poisoned");

        let Some(Located {
            path,
            manifest: Manifest::Config(current),
        }) = self.locate(ManifestKind::ConfigMap, &key)?
        else {
            return Err(StoreError::NotFound(key));
        };
        check_version(
            &key,
            object.metadata.resource_version,
            current.metadata.resource_version,
        )?;

        let mut stored = object.clone();
        stored.metadata.resource_version = current.metadata.resource_version + 1;
        self.write_manifest(&path, &Manifest::Config(stored.clone()))?;
        Ok(stored)
    }
}
