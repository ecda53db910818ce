//! Session configuration via `cfgdb.toml` and the environment.
//!
//! ```toml
//! # Directories searched for includes that are not found next to the
//! # including file.
//! search_path = ["/opt/config/schema", "/opt/config/data"]
//!
//! # Recorded in the header of every committed data file.
//! author = "operator"
//!
//! # Flush temporary files before publishing them (default: true).
//! sync_on_commit = true
//!
//! # Refuse to overwrite files changed by someone else (default: true).
//! detect_external_changes = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable holding the include search path, `:` separated.
pub const SEARCH_PATH_VAR: &str = "CFGDB_PATH";

/// Environment variable naming the commit author.
pub const AUTHOR_VAR: &str = "USER";

/// Settings of a configuration session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default)]
    pub search_path: Vec<PathBuf>,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_true")]
    pub sync_on_commit: bool,
    #[serde(default = "default_true")]
    pub detect_external_changes: bool,
}

fn default_author() -> String {
    "unknown".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            search_path: Vec::new(),
            author: default_author(),
            sync_on_commit: true,
            detect_external_changes: true,
        }
    }
}

impl DbConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Read settings from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(path, &text)
    }

    fn from_toml_str(path: &Path, text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply `CFGDB_PATH` and `USER`. Search path entries from the
    /// environment come after those already configured.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(SEARCH_PATH_VAR) {
            self.search_path.extend(split_search_path(&value));
        }
        if let Ok(user) = std::env::var(AUTHOR_VAR) {
            if !user.is_empty() {
                self.author = user;
            }
        }
        self
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path.push(dir.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

fn split_search_path(value: &str) -> impl Iterator<Item = PathBuf> + '_ {
    value
        .split(':')
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
}
