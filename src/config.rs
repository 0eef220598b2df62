//! Configuration loading.
//!
//! Precedence, highest to lowest: explicit CLI override, `STASH_*`
//! environment variables, config file, platform defaults.

use crate::error::StoreError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StashConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the private storage area lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage root directory; None means use the platform data directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl StashConfig {
    /// Load configuration from an optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, StoreError> {
        let mut builder = config::Config::builder();

        match file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder =
                        builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("STASH")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Resolve the storage root: explicit override, then config, then the
    /// platform data directory.
    pub fn store_root(&self, cli_root: Option<&Path>) -> Result<PathBuf, StoreError> {
        if let Some(root) = cli_root {
            return Ok(root.to_path_buf());
        }
        if let Some(root) = &self.store.root {
            return Ok(root.clone());
        }
        default_store_root()
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "stash", "stash")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_store_root() -> Result<PathBuf, StoreError> {
    let dirs = directories::ProjectDirs::from("", "stash", "stash").ok_or_else(|| {
        StoreError::Config("could not determine platform data directory for the store".to_string())
    })?;
    Ok(dirs.data_dir().join("store"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_file_is_given() {
        let config = StashConfig::default();
        assert!(config.store.root.is_none());
        assert!(config.logging.enabled);
    }

    #[test]
    fn cli_root_wins_over_config_root() {
        let config = StashConfig {
            store: StoreConfig {
                root: Some(PathBuf::from("/from/config")),
            },
            ..Default::default()
        };
        let root = config.store_root(Some(Path::new("/from/cli"))).unwrap();
        assert_eq!(root, PathBuf::from("/from/cli"));
        let root = config.store_root(None).unwrap();
        assert_eq!(root, PathBuf::from("/from/config"));
    }

    #[test]
    fn load_reads_a_toml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\nroot = \"/tmp/stash-store\"\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = StashConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store.root, Some(PathBuf::from("/tmp/stash-store")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn load_fails_on_an_unreadable_explicit_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");
        assert!(matches!(
            StashConfig::load(Some(&missing)),
            Err(StoreError::Config(_))
        ));
    }
}
