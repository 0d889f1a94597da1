//! The automated second seat at the dice poker table.
//!
//! The dealer reads the table contract, decides one move when it is its turn,
//! submits exactly one transaction for it and waits for the receipt. An HTTP
//! front end forwards every request into a single [`app::App`] loop, so at
//! most one turn is in flight per process.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    prelude::*,
    util::TryInitError,
};

pub mod app;
pub mod banter;
pub mod chat;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod faucet;
pub mod gateway;
pub mod intel;
pub mod llm;
pub mod table;
pub mod tracker;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{
    Error,
    ErrorCategory,
    SubmissionOutcome,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

const LOG_FILE_PREFIX: &str = "dealer.log";

/// Installs the global subscriber. `RUST_LOG` wins over the `info` default.
///
/// With a log directory the output also goes to a daily rolling file; keep the
/// returned guard alive for as long as logs should be flushed. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout = fmt::layer().with_target(false);
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .with(file)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .try_init()?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn init_tracing__reports_an_already_installed_subscriber() {
        // given
        let _ = init_tracing(None);

        // when
        let second = init_tracing(Some(&std::env::temp_dir()));

        // then
        assert!(second.is_err());
    }
}
