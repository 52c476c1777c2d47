use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Folder holding rig components, both in the install and in feature sets.
pub const RIGS_SUBDIR: &str = "rigs";

const APP_DIR: &str = "Rigkit";

/// Where the catalog looks for components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// The built-in component library.
    pub builtin_root: PathBuf,
    /// Parent directory of user-installed feature sets.
    pub feature_sets_dir: Option<PathBuf>,
    pub rigs_subdir: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let builtin_root = dirs::data_dir()
            .map(|data| data.join(APP_DIR).join(RIGS_SUBDIR))
            .unwrap_or_else(|| PathBuf::from(RIGS_SUBDIR));
        let feature_sets_dir = dirs::data_dir().map(|data| data.join(APP_DIR).join("feature_sets"));
        Self {
            builtin_root,
            feature_sets_dir,
            rigs_subdir: RIGS_SUBDIR.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Configuration rooted at an install directory containing `rigs/`.
    pub fn for_install(install_dir: impl AsRef<Path>) -> Self {
        Self {
            builtin_root: install_dir.as_ref().join(RIGS_SUBDIR),
            feature_sets_dir: None,
            rigs_subdir: RIGS_SUBDIR.to_string(),
        }
    }

    pub fn with_feature_sets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.feature_sets_dir = Some(dir.into());
        self
    }

    /// Reads a configuration file, falling back to defaults when it is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        if !value.is_object() {
            return Err(CatalogError::Config(serde::de::Error::custom(
                "catalog configuration must be a JSON object",
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf, CatalogError> {
        let mut config_dir = dirs::config_dir().ok_or_else(|| {
            CatalogError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory",
            ))
        })?;
        config_dir.push(APP_DIR);
        fs::create_dir_all(&config_dir)?;
        config_dir.push("catalog.json");
        Ok(config_dir)
    }
}
