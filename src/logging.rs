//! Log setup for the two run modes.
//!
//! The dashboard owns the terminal in interactive mode, so logs go to a file
//! there and to stderr in headless mode.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// sqlx reports every statement at info; keep that out unless asked for.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

impl LogTarget {
    /// File logging for the TUI, stderr for headless runs.
    pub fn for_mode(headless: bool) -> Self {
        if headless {
            Self::Stderr
        } else {
            Self::File(get_log_path())
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// A log file that cannot be created disables logging with a warning on
/// stderr; the dashboard still starts.
pub fn init(target: &LogTarget) {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(path) => {
            let Some(file) = open_log_file(path) else {
                return;
            };
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(file)
                .with_ansi(false)
                .init();
        }
    }
}

/// Creates the log file, truncating the previous run's log.
fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory {}: {e}", parent.display());
            return None;
        }
    }
    match File::create(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Could not create log file {}: {e}", path.display());
            None
        }
    }
}

/// `<state_dir>/match-dash/match-dash.log`, falling back to the config
/// directory and then the temp directory.
pub fn get_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("match-dash").join("match-dash.log"))
        .unwrap_or_else(|| std::env::temp_dir().join("match-dash.log"))
}
