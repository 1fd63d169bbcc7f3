//! Watch loop: filesystem changes and a periodic resync trigger debounced passes.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use rulefold_core::config::WatchConfig;

use crate::driver::Reconciler;
use crate::store::{is_manifest_path, ObjectStore, WriteJournal};

/// Whether a filesystem event can change the inputs or outputs of a pass.
///
/// Paths that still hold what the store itself last wrote there are not
/// changes: the pass that wrote them already saw that state.
pub fn is_relevant_event(event: &Event, journal: &WriteJournal) -> bool {
    let kind_matters = matches!(
        event.kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Remove(RemoveKind::File)
            | EventKind::Remove(RemoveKind::Any)
    );
    kind_matters
        && event
            .paths
            .iter()
            .any(|p| is_manifest_path(p) && !journal.is_own_write(p))
}

/// Start a recursive watcher on `root` that sends a tick per relevant event.
///
/// The returned watcher must be kept alive for events to flow.
pub fn spawn_watcher(
    root: &Path,
    journal: WriteJournal,
    tx: mpsc::Sender<()>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_relevant_event(&event, &journal) => {
            // A full channel already has a pass pending.
            let _ = tx.try_send(());
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "filesystem watcher error"),
    })?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    info!(path = %root.display(), "watching object store for changes (recursive)");
    Ok(watcher)
}

/// Run one pass on the blocking pool. Errors are logged, never propagated.
pub async fn run_pass<S: ObjectStore + 'static>(reconciler: Arc<Reconciler<S>>, trigger: &str) {
    debug!(trigger, "starting reconciliation pass");
    match tokio::task::spawn_blocking(move || reconciler.reconcile()).await {
        Ok(Ok(report)) => {
            if report.is_noop() {
                debug!(trigger, "pass made no changes");
            }
        }
        Ok(Err(e)) => error!(trigger, error = %e, "reconciliation pass failed"),
        Err(e) => error!(trigger, error = %e, "reconciliation task panicked"),
    }
}

/// Drive passes until `shutdown` resolves or the event channel closes.
///
/// Bursts of change ticks collapse into one pass once `debounce_ms` passes
/// without a new tick. With `resync_secs > 0` a pass also runs on that period.
pub async fn watch_loop<S, F>(
    reconciler: Arc<Reconciler<S>>,
    mut rx: mpsc::Receiver<()>,
    config: &WatchConfig,
    shutdown: F,
) where
    S: ObjectStore + 'static,
    F: Future<Output = ()>,
{
    let debounce = Duration::from_millis(config.debounce_ms);
    let resync_period = (config.resync_secs > 0).then(|| Duration::from_secs(config.resync_secs));

    // First resync one period from now; the startup pass already ran.
    let mut resync = tokio::time::interval_at(
        Instant::now() + resync_period.unwrap_or(Duration::from_secs(3600)),
        resync_period.unwrap_or(Duration::from_secs(3600)),
    );
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut deadline: Option<Instant> = None;
    tokio::pin!(shutdown);

    loop {
        let settle_at = deadline;
        let settle = async move {
            match settle_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping watch loop");
                break;
            }
            tick = rx.recv() => {
                if tick.is_none() {
                    warn!("watcher channel closed, stopping watch loop");
                    break;
                }
                deadline = Some(Instant::now() + debounce);
            }
            _ = settle => {
                deadline = None;
                run_pass(Arc::clone(&reconciler), "change").await;
            }
            _ = resync.tick(), if resync_period.is_some() => {
                run_pass(Arc::clone(&reconciler), "resync").await;
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
pub async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{DataChange, ModifyKind};

    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    fn relevant(event: &Event) -> bool {
        is_relevant_event(event, &WriteJournal::default())
    }

    #[test]
    fn yaml_changes_are_relevant() {
        assert!(relevant(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/store/kof/rules.yaml",
        )));
        assert!(relevant(&event(
            EventKind::Remove(RemoveKind::File),
            "/store/kof/rules.yml",
        )));
        assert!(relevant(&event(
            EventKind::Modify(ModifyKind::Name(notify::event::RenameMode::To)),
            "/store/kof/out.yaml",
        )));
    }

    #[test]
    fn temp_and_foreign_files_are_ignored() {
        let modify = || EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(!relevant(&event(modify(), "/store/kof/.out.tmp")));
        assert!(!relevant(&event(modify(), "/store/kof/.hidden.yaml")));
        assert!(!relevant(&event(modify(), "/store/kof/readme.md")));
    }

    #[test]
    fn access_events_are_ignored() {
        assert!(!relevant(&event(
            EventKind::Access(notify::event::AccessKind::Read),
            "/store/kof/rules.yaml",
        )));
    }

    #[test]
    fn own_writes_are_ignored_until_edited() {
        use rulefold_core::{ObjectKey, ObjectMeta};

        use crate::manifest::ConfigObject;
        use crate::store::FsObjectStore;

        let dir = tempfile::TempDir::new().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let journal = store.journal();
        let path = store
            .create_config(&ConfigObject::new(ObjectMeta::new("kof", "out")))
            .unwrap();
        let current = store.get_config(&ObjectKey::new("kof", "out")).unwrap().unwrap();
        store
            .update_config(&current.with_data("values", "a: 1\n"))
            .unwrap();

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(
            notify::event::RenameMode::Both,
        )))
        .add_path(path.with_file_name(".out.yaml.tmp"))
        .add_path(path.clone());
        assert!(!is_relevant_event(&renamed, &journal));

        std::fs::write(&path, "kind: ConfigMap\nmetadata:\n  name: out\n").unwrap();
        let edited = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.clone());
        assert!(is_relevant_event(&edited, &journal));
    }
}
