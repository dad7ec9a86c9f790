//! Project configuration in `.stackscope/config.json`.

use serde::{Deserialize, Serialize};
use stackscope_graph::{GraphMode, LayoutConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_DIR: &str = ".stackscope";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    /// Directory holding `.pulumi/stacks`.
    pub state_dir: PathBuf,
    pub structural: LayoutConfig,
    pub dependency: LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            state_dir: PathBuf::from("."),
            structural: LayoutConfig::for_mode(GraphMode::Structural),
            dependency: LayoutConfig::for_mode(GraphMode::Dependency),
        }
    }
}

impl Config {
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Reads the config under `root`, or the defaults when there is none.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(root);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json { path, source })
    }

    /// Writes the config under `root`, creating the directory.
    pub fn save(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let path = Self::path(root);
        let io_error = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(io_error)?;

        Ok(path)
    }

    pub fn layout_for(&self, mode: GraphMode) -> LayoutConfig {
        match mode {
            GraphMode::Structural => self.structural.clone(),
            GraphMode::Dependency => self.dependency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackscope_graph::RankDirection;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.layout_for(GraphMode::Dependency).rank_spacing, 80.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.state_dir = PathBuf::from("/srv/pulumi");
        config.structural.direction = RankDirection::TopBottom;

        let path = config.save(dir.path()).unwrap();
        assert!(path.ends_with(".stackscope/config.json"));
        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(
            Config::path(dir.path()),
            r#"{"dependency": {"direction": "TB"}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.dependency.direction, RankDirection::TopBottom);
        assert_eq!(config.dependency.node_width, 220.0);
        assert_eq!(config.state_dir, PathBuf::from("."));
    }

    #[test]
    fn test_invalid_config_reported() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(Config::path(dir.path()), "{not json").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ConfigError::Json { .. })
        ));
    }
}
