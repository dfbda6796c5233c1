//! Structured logging settings.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "LEARNGRAPH_LOG";

const DEFAULT_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging config from file settings.
    ///
    /// Filter precedence: `--verbose` (forces `debug`), `LEARNGRAPH_LOG`,
    /// `RUST_LOG`, the configured level, then `info`. An unparseable directive
    /// falls back to `info`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let configured = settings.and_then(|s| s.level.clone());
        let directive = if verbose {
            "debug".to_string()
        } else {
            std::env::var(LOG_ENV)
                .ok()
                .or_else(|| std::env::var(EnvFilter::DEFAULT_ENV).ok())
                .or(configured)
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
        };

        Self {
            format: settings
                .and_then(|s| s.format.as_deref())
                .map_or_else(LogFormat::default, LogFormat::parse),
            filter: parse_filter(&directive),
            file: settings.and_then(|s| s.file.clone()),
        }
    }
}

fn parse_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}
