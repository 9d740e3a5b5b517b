//! File logging for the TUI.
//!
//! The terminal belongs to ratatui, so events go to a daily-rolling file in
//! the data directory instead of stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the program or buffered lines are lost on exit.
pub fn init(log_dir: &Path, default_level: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "iptv-lineup.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("iptv_lineup_lib={default_level},iptv_lineup={default_level}")))?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("iptv-lineup v{} starting", env!("CARGO_PKG_VERSION"));
    Ok(guard)
}
