//! Export Configuration
//!
//! Optional JSON file read by the CLI. Command-line flags override it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    /// URL or directory holding `template.html` and the static `assets/`.
    #[serde(default = "default_static_root")]
    pub static_root: String,
    /// Directory of session uploads, each file mapped to `/assets/<relative>`.
    #[serde(default)]
    pub uploads_dir: Option<String>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_static_root() -> String { "public".to_string() }
fn default_log_filter() -> String { "warn".to_string() }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            static_root: default_static_root(),
            uploads_dir: None,
            log_filter: default_log_filter(),
        }
    }
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Flags given on the command line replace file values.
    pub fn merge(mut self, static_root: Option<String>, uploads_dir: Option<String>) -> Self {
        if let Some(root) = static_root {
            self.static_root = root;
        }
        if uploads_dir.is_some() {
            self.uploads_dir = uploads_dir;
        }
        self
    }
}
