// ABOUTME: Shared logging setup for the tmate-operator hooks and actions
// ABOUTME: init() for stderr, init_file() for hook logs on disk, init_for() for crate-scoped output

use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Append hook output to `{state_dir}/{app_name}/{app_name}.log`.
///
/// Hooks run unattended, so the log file is what an operator reads after the
/// fact. Falls back to stderr logging if the file cannot be opened.
pub fn init_file(app_name: &str) {
    match open_log_file(app_name) {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_env_filter(
                    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
                )
                .with_ansi(false)
                .init();
        }
        Err(e) => {
            eprintln!("Warning: failed to set up file logging: {e}");
            init();
        }
    }
}

/// Crate-filtered logging to stderr. Default: INFO for named crate, WARN for everything else.
pub fn init_for(crate_name: &str) {
    let directive = format!("{crate_name}=info");
    let filter = EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into())
        .add_directive(
            directive
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        );

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Directory that holds the log file for `app_name`.
///
/// Prefers the platform state dir, then the local data dir, then `/var/log`.
pub fn log_dir(app_name: &str) -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/var/log"))
        .join(app_name)
}

fn open_log_file(app_name: &str) -> std::io::Result<std::fs::File> {
    open_log_file_in(&log_dir(app_name), app_name)
}

fn open_log_file_in(dir: &Path, app_name: &str) -> std::io::Result<std::fs::File> {
    std::fs::create_dir_all(dir)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{app_name}.log")))
}
