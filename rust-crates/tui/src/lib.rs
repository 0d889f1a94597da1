//! Terminal view of a dice poker table played against the dealer service.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    util::{SubscriberInitExt, TryInitError},
};

pub mod dealer_client;
pub mod screen;
pub mod ui;
pub mod worker;

/// The terminal belongs to the UI, so logs only go to a rolling file.
pub fn init_file_tracing(log_dir: &Path) -> Result<WorkerGuard, TryInitError> {
    let appender = tracing_appender::rolling::daily(log_dir, "table-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish()
        .try_init()?;
    Ok(guard)
}
