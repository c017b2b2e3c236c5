use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Daily file under the data dir; used while the terminal UI owns the screen.
    File,
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init(level: &str, target: LogTarget) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
            Ok(None)
        }
        LogTarget::File => {
            let dir = log_dir();
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, "hunt-board.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
            Ok(Some(guard))
        }
    }
}

pub fn log_dir() -> PathBuf {
    // XDG data directory, or the working directory as a fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "hunt-board") {
        proj_dirs.data_dir().join("logs")
    } else {
        PathBuf::from("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_logs() {
        assert!(log_dir().ends_with("logs"));
    }
}
