//! Configuration for findingstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database
    #[serde(default = "default_db_path", rename = "db-path")]
    pub db_path: PathBuf,

    /// Rows returned when no limit is given
    #[serde(default = "default_limit", rename = "default-limit")]
    pub default_limit: usize,
}

fn default_db_path() -> PathBuf {
    crate::default_db_path()
}

fn default_limit() -> usize {
    crate::DEFAULT_QUERY_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_limit: default_limit(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("deepresearch").join("findingstore.yml")),
            Some(PathBuf::from("findingstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
