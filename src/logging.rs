//! Logging setup for the command line tools.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install a global subscriber that logs to stderr and, optionally, to a file.
///
/// The stderr level is taken from the `RUST_LOG` environment variable and
/// defaults to `info`. The log file, if any, receives everything at `debug`
/// and above.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn setup_logging(log_file: Option<&Path>) -> Result<(), io::Error> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(io::stderr)
        .with_filter(env_filter);

    let file_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(file_log)
        .init();

    Ok(())
}
