/// Log output for hosts driving the NWIS model.
///
/// The library itself only emits `tracing` events (fetch URL, response size,
/// table shape, step changes). Hosts that have no subscriber of their own can
/// call `init` to print them to stderr or append them to a file.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Crate target used to build the default filter.
const CRATE_TARGET: &str = "nwis_bmi";

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Default filter: this crate at `min_level`, everything else silent.
pub fn default_filter(min_level: LogLevel) -> String {
    format!("{}={}", CRATE_TARGET, min_level.as_directive())
}

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` overrides `min_level` if set. With `log_file`, events are
/// appended to that file instead of stderr.
pub fn init(min_level: LogLevel, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(min_level)));

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::OpenLogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_default_filter_targets_this_crate() {
        assert_eq!(default_filter(LogLevel::Warning), "nwis_bmi=warn");
        assert_eq!(default_filter(LogLevel::Debug), "nwis_bmi=debug");
    }

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let err = init(LogLevel::Info, Some(Path::new("/no/such/dir/nwis.log"))).unwrap_err();
        assert!(matches!(err, LoggingError::OpenLogFile { .. }));
    }

    #[test]
    fn test_init_installs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nwis.log");
        init(LogLevel::Debug, Some(path.as_path())).unwrap();
        assert!(path.exists());
        assert!(matches!(
            init(LogLevel::Debug, None),
            Err(LoggingError::AlreadyInstalled)
        ));
    }
}
