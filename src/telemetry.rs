//! Access and error logging.
//!
//! Request handling reports through a [`LogSink`] handle handed to the server.
//! The production sink, [`TracingSink`], turns each entry into a `tracing` event
//! on a dedicated target; [`init`] routes those targets into the configured
//! access and error log files next to the usual console output.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

use crate::config::Config;

pub const ACCESS_TARGET: &str = "splice::access";
pub const ERROR_TARGET: &str = "splice::error";

/// Receives access and error log entries.
pub trait LogSink: Send + Sync {
    /// A request line received from `peer`.
    fn access(&self, peer: &str, message: &str);

    fn error(&self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn access(&self, peer: &str, message: &str) {
        tracing::info!(target: ACCESS_TARGET, peer, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: ERROR_TARGET, "{message}");
    }
}

/// Installs the global subscriber: console output at INFO plus one append-only
/// file per log target.
pub fn init(cfg: &Config) -> anyhow::Result<()> {
    let access = open_append(&cfg.access_log)?;
    let error = open_append(&cfg.error_log)?;

    let console = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_filter(LevelFilter::INFO);

    let access_file = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(access))
        .with_filter(filter_fn(|meta| meta.target() == ACCESS_TARGET));

    let error_file = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(error))
        .with_filter(filter_fn(|meta| meta.target() == ERROR_TARGET));

    tracing_subscriber::registry()
        .with(console)
        .with(access_file)
        .with(error_file)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

fn open_append(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
