//! Calculator configuration
//!
//! Layered lowest to highest: defaults, an optional JSON file, then the
//! `ABACUS_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_EXTENSION_DIR: &str = "ABACUS_EXTENSION_DIR";
pub const ENV_NORMALIZE_NEGATIVE_ZERO: &str = "ABACUS_NORMALIZE_NEGATIVE_ZERO";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Directory scanned for extension modules
    pub extension_dir: PathBuf,
    /// Return `0` instead of `-0` from `calculate`
    pub normalize_negative_zero: bool,
    /// Whether front ends should scan `extension_dir` at startup
    pub scan_on_init: bool,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            extension_dir: PathBuf::from("./plugins"),
            normalize_negative_zero: true,
            scan_on_init: true,
        }
    }
}

impl CalculatorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Defaults, overlaid with `path` if given, overlaid with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `ABACUS_*` overrides read through `lookup`.
    pub fn with_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup(ENV_EXTENSION_DIR).filter(|d| !d.trim().is_empty()) {
            self.extension_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_NORMALIZE_NEGATIVE_ZERO) {
            self.normalize_negative_zero = parse_flag(ENV_NORMALIZE_NEGATIVE_ZERO, &value)?;
        }
        Ok(self)
    }

    pub fn with_extension_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extension_dir = dir.into();
        self
    }

    pub fn with_normalize_negative_zero(mut self, normalize: bool) -> Self {
        self.normalize_negative_zero = normalize;
        self
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
