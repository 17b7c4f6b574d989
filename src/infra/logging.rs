// ============================================================
// Layer 6 — Logging Setup
// ============================================================
// Console output for every command, plus a plain-text copy in
// the run directory for training runs.
//
// RUST_LOG overrides the default `ucnet_steganalysis=info`.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "ucnet_steganalysis=info";

fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive(DEFAULT_DIRECTIVE.parse()?))
}

/// Install the global subscriber.
///
/// With `log_file`, every event is also written there without ANSI
/// colours. `append` keeps an existing log (used when resuming).
pub fn init(log_file: Option<&Path>, append: bool) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(append)
                .truncate(!append)
                .open(path)
                .with_context(|| format!("Cannot open log file '{}'", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(())
}
