//! Centralized configuration for docindex.
//!
//! Constants live on unit structs; the runtime [`IndexingConfig`] is loaded
//! from a JSON file and falls back to these defaults for any missing field.

use crate::error::{DocIndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default values shared by the engine and the CLI.
pub struct IndexingDefaults;

impl IndexingDefaults {
    pub const URL_PREFIX: &'static str = "/indexing";
    pub const BREADCRUMB_SEPARATOR: &'static str = " / ";
    pub const ROOT_LABEL: &'static str = "root";
    pub const DATABASE_FILENAME: &'static str = "docindex.db";
    pub const CONFIG_FILENAME: &'static str = "docindex.json";
}

/// SQLite connection settings.
pub struct StoreConfig;

impl StoreConfig {
    pub const BUSY_TIMEOUT_MS: u64 = 30_000;
}

/// Runtime configuration for a [`crate::DocumentIndexer`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Slugify instance values and document labels in mirrored paths.
    pub slugify_paths: bool,
    /// On-disk mirror of the instance tree.
    pub fileserving: FileServingConfig,
    /// Names of the index functions expressions may call. `None` allows the
    /// whole registry.
    pub allowed_functions: Option<Vec<String>>,
    /// Link and breadcrumb rendering.
    pub presentation: PresentationConfig,
}

/// Settings for the filesystem mirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileServingConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
}

/// Settings for [`crate::Presenter`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresentationConfig {
    pub url_prefix: String,
    pub separator: String,
    pub root_label: String,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            url_prefix: IndexingDefaults::URL_PREFIX.to_string(),
            separator: IndexingDefaults::BREADCRUMB_SEPARATOR.to_string(),
            root_label: IndexingDefaults::ROOT_LABEL.to_string(),
        }
    }
}

impl IndexingConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| DocIndexError::Io {
            message: format!("Failed to read config file {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;
        let config: IndexingConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.fileserving.enabled && self.fileserving.path.is_none() {
            return Err(DocIndexError::Validation {
                field: "fileserving.path".to_string(),
                message: "required when fileserving is enabled".to_string(),
            });
        }
        if self.presentation.separator.is_empty() {
            return Err(DocIndexError::Validation {
                field: "presentation.separator".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Mirror root, if the mirror is switched on.
    pub fn fileserving_root(&self) -> Option<&Path> {
        if self.fileserving.enabled {
            self.fileserving.path.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = IndexingConfig::default();
        assert!(!config.slugify_paths);
        assert!(config.fileserving_root().is_none());
        assert_eq!(config.presentation.separator, " / ");
        assert_eq!(config.presentation.root_label, "root");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docindex.json");
        std::fs::write(
            &path,
            r#"{"slugify_paths": true, "presentation": {"root_label": "All"}}"#,
        )
        .unwrap();

        let config = IndexingConfig::load(&path).unwrap();
        assert!(config.slugify_paths);
        assert_eq!(config.presentation.root_label, "All");
        assert_eq!(config.presentation.url_prefix, "/indexing");
    }

    #[test]
    fn test_fileserving_requires_path() {
        let mut config = IndexingConfig::default();
        config.fileserving.enabled = true;
        assert!(config.validate().is_err());

        config.fileserving.path = Some(PathBuf::from("/srv/index"));
        assert!(config.validate().is_ok());
        assert_eq!(config.fileserving_root(), Some(Path::new("/srv/index")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = IndexingConfig::load("/nonexistent/docindex.json").unwrap_err();
        assert!(matches!(err, DocIndexError::Io { .. }));
    }
}
