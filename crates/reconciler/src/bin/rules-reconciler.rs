//! rules-reconciler: merges monitoring rules from the object store and writes
//! the alert bundle and per-cluster record bundles back to it.
//!
//! Runs one pass at startup, then watches the store directory and runs a
//! debounced pass after every burst of changes, plus a periodic resync.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use rulefold_core::config::{load_dotenv, Config};
use rulefold_reconciler::store::FsObjectStore;
use rulefold_reconciler::watcher::{os_signal, run_pass, spawn_watcher, watch_loop};
use rulefold_reconciler::Reconciler;

// ── CLI ─────────────────────────────────────────────────────────────

/// Monitoring-rule reconciler: base rules + default and cluster overrides.
#[derive(Parser, Debug)]
#[command(name = "rules-reconciler", version, about)]
struct Cli {
    /// Path to a TOML config file. Environment variables still override it.
    #[arg(long, env = "RULEFOLD_CONFIG")]
    config: Option<PathBuf>,

    /// Object store root directory.
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Run a single pass and exit.
    #[arg(long)]
    once: bool,

    /// Quiet period in milliseconds before a change triggers a pass.
    #[arg(long)]
    debounce_ms: Option<u64>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::from_env().context("failed to load config from environment")?,
    };
    if let Some(dir) = &cli.store_dir {
        config.store.root = dir.clone();
    }
    if let Some(ms) = cli.debounce_ms {
        config.watch.debounce_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.log_summary();

    let store = Arc::new(FsObjectStore::open(&config.store.root)?);
    let reconciler = Arc::new(Reconciler::from_config(Arc::clone(&store), &config)?);

    if cli.once {
        let worker = Arc::clone(&reconciler);
        let report = tokio::task::spawn_blocking(move || worker.reconcile()).await??;
        info!(
            targets = report.outcomes.len(),
            updated = report.updated_count(),
            "single pass finished"
        );
        return Ok(());
    }

    // Startup pass; failures are logged and retried on the next trigger.
    run_pass(Arc::clone(&reconciler), "startup").await;

    let (tx, rx) = mpsc::channel(1);
    let _watcher = spawn_watcher(store.root(), store.journal(), tx)?;

    watch_loop(reconciler, rx, &config.watch, os_signal()).await;
    info!("rules reconciler stopped");
    Ok(())
}
