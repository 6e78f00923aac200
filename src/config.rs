use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clipboard::CopyCommand;
use crate::fileio::LoadOptions;
use crate::util::{parse_delimiter, WidthMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// comma, tab, semicolon, pipe or a single character; unset means auto-detect
    pub delimiter: Option<String>,
    pub trim: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Replaces the platform copy tools when set
    pub fallback_commands: Option<Vec<CopyCommand>>,
    /// Where the copy tools' staging file is written; system temp dir if unset
    pub staging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// How long the "Copied" indicator stays up
    pub copy_feedback_ms: u64,
    pub max_rows: usize,
    pub max_cols: usize,
    /// `chars` (default) or `display` to pad by terminal columns
    pub width_mode: WidthMode,
    pub csv: CsvConfig,
    pub clipboard: ClipboardConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let limits = LoadOptions::default();
        Self {
            copy_feedback_ms: 2000,
            max_rows: limits.max_rows,
            max_cols: limits.max_cols,
            width_mode: limits.width_mode,
            csv: CsvConfig::default(),
            clipboard: ClipboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// An explicit path must load. The default location is optional, and a broken
    /// file there only costs a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        match Self::from_file(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(error = %e, "ignoring config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(d) = &self.csv.delimiter {
            if parse_delimiter(d).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "csv.delimiter '{}' is not comma, tab, semicolon, pipe, or a single character",
                    d
                )));
            }
        }
        if self.max_rows == 0 || self.max_cols == 0 {
            return Err(ConfigError::Invalid("max_rows and max_cols must be positive".to_string()));
        }
        Ok(())
    }

    /// Loader options; a delimiter given on the command line beats the config
    pub fn load_options(&self, cli_delimiter: Option<u8>) -> LoadOptions {
        LoadOptions {
            delimiter: cli_delimiter
                .or_else(|| self.csv.delimiter.as_deref().and_then(parse_delimiter)),
            trim: self.csv.trim,
            max_rows: self.max_rows,
            max_cols: self.max_cols,
            width_mode: self.width_mode,
        }
    }

    pub fn copy_window(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }

    pub fn fallback_commands(&self) -> Vec<CopyCommand> {
        self.clipboard
            .fallback_commands
            .clone()
            .unwrap_or_else(CopyCommand::platform_defaults)
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config/tabcopy")
    } else {
        PathBuf::from(".config/tabcopy")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}
