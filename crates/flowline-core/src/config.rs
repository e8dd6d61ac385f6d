//! Content handling configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for request content ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Character set assumed for text content when none is declared.
    #[serde(default = "default_char_set")]
    pub char_set_default: String,
    /// Declared lengths above this many bytes spill to disk instead of
    /// buffering in memory.
    #[serde(default = "default_spill_threshold")]
    pub spill_threshold: u64,
    /// Directory spill files are written to. Created at startup;
    /// startup fails if it cannot be created or is not writable.
    #[serde(default = "default_spill_dir")]
    pub spill_dir: PathBuf,
}

fn default_char_set() -> String {
    "UTF-8".to_string()
}

fn default_spill_threshold() -> u64 {
    1024 * 1024
}

fn default_spill_dir() -> PathBuf {
    std::env::temp_dir().join("flowline-requests")
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            char_set_default: default_char_set(),
            spill_threshold: default_spill_threshold(),
            spill_dir: default_spill_dir(),
        }
    }
}

impl ContentConfig {
    /// Load the configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ContentConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
