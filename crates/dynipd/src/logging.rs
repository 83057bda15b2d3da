//! Logger setup from the `logging` configuration section

use anyhow::{Context, Result};
use dynip_core::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Console,
    File(std::path::PathBuf),
}

impl LogTarget {
    fn from_config(config: &LoggingConfig) -> Self {
        match config.destination.as_str() {
            "" | "console" => LogTarget::Console,
            path => LogTarget::File(path.into()),
        }
    }
}

/// Parse a level name, case-insensitive
pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level).unwrap_or(Level::INFO);

    match LogTarget::from_config(config) {
        LogTarget::Console => {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO"), Some(Level::INFO));
        assert_eq!(parse_level("Warn"), Some(Level::WARN));
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_target_from_destination() {
        let console = LoggingConfig::default();
        assert_eq!(LogTarget::from_config(&console), LogTarget::Console);

        let file = LoggingConfig {
            destination: "/var/log/dynip.log".to_string(),
            level: "debug".to_string(),
        };
        assert_eq!(
            LogTarget::from_config(&file),
            LogTarget::File("/var/log/dynip.log".into())
        );
    }
}
