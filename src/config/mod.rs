//! Configuration management.
//!
//! Settings come from a TOML file, then environment overrides are applied.
//! File lookup order:
//!
//! 1. An explicit path (the `--config` flag)
//! 2. `LEARNGRAPH_CONFIG_PATH`
//! 3. Platform config dir (`~/Library/Application Support/learngraph/` on macOS)
//! 4. XDG-style `~/.config/learngraph/`
//! 5. Built-in defaults

use crate::models::validate_confidence;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "LEARNGRAPH_CONFIG_PATH";

const DEFAULT_DATA_DIR: &str = ".learngraph";
const DB_FILE_NAME: &str = "knowledge.db";

/// Main configuration for learngraph.
#[derive(Debug, Clone, PartialEq)]
pub struct LearngraphConfig {
    /// Directory holding the knowledge database.
    pub data_dir: PathBuf,
    /// Explicit database path; defaults to `<data_dir>/knowledge.db`.
    pub db_path: Option<PathBuf>,
    /// Token budget for session context.
    pub max_tokens: usize,
    /// Render file paths in session context.
    pub show_file_paths: bool,
    /// Maximum learnings fetched for session context.
    pub query_limit: usize,
    /// Confidence assigned to learnings captured at session end.
    pub session_end_confidence: f64,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging settings from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `learngraph=debug`.
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database path.
    pub db_path: Option<String>,
    /// Token budget.
    pub max_tokens: Option<usize>,
    /// Show file paths.
    pub show_file_paths: Option<bool>,
    /// Query limit.
    pub query_limit: Option<usize>,
    /// Session-end confidence.
    pub session_end_confidence: Option<f64>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

impl Default for LearngraphConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_path: None,
            max_tokens: crate::rendering::DEFAULT_MAX_TOKENS,
            show_file_paths: true,
            query_limit: 20,
            session_end_confidence: 0.6,
            logging: LoggingSettings::default(),
        }
    }
}

impl LearngraphConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the database path.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DB_FILE_NAME))
    }

    /// Loads configuration following the lookup order, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an explicitly named file cannot be read or
    /// parsed, or if an override has an invalid value.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or holds
    /// an invalid value.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let file: ConfigFile = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        let config = Self::from_config_file(file);
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Returns default configuration if no usable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("learngraph").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("learngraph")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(error = %e, "Ignoring unusable config file"),
            }
        }

        Self::default()
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `LEARNGRAPH_MAX_TOKENS` is not a number.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LEARNGRAPH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("LEARNGRAPH_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("LEARNGRAPH_MAX_TOKENS") {
            self.max_tokens = raw.trim().parse().map_err(|_| {
                Error::Config(format!("LEARNGRAPH_MAX_TOKENS must be a number, got '{raw}'"))
            })?;
        }
        if let Some(format) = lookup("LEARNGRAPH_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(level) = lookup("LEARNGRAPH_LOG") {
            self.logging.level = Some(level);
        }
        Ok(self)
    }

    /// Converts a `ConfigFile` to `LearngraphConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.db_path = file.db_path.map(PathBuf::from);
        if let Some(max_tokens) = file.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(show) = file.show_file_paths {
            config.show_file_paths = show;
        }
        if let Some(limit) = file.query_limit {
            config.query_limit = limit;
        }
        if let Some(confidence) = file.session_end_confidence {
            config.session_end_confidence = confidence;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    fn validate(&self) -> Result<()> {
        validate_confidence(self.session_end_confidence)
            .map_err(|e| Error::Config(format!("session_end_confidence: {e}")))
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets an explicit database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }
}
