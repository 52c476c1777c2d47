use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::CatalogError;

/// Tag of the component library shipped with the add-on.
pub const BUILTIN_TAG: &str = "built-in";

/// Identifies which feature set supplied a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureSetId {
    BuiltIn,
    External(String),
}

impl FeatureSetId {
    /// Tag for an externally supplied set. The built-in tag is reserved.
    pub fn external(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        if name == BUILTIN_TAG {
            return Err(CatalogError::ReservedFeatureSet(name));
        }
        Ok(FeatureSetId::External(name))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FeatureSetId::BuiltIn)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FeatureSetId::BuiltIn => BUILTIN_TAG,
            FeatureSetId::External(name) => name,
        }
    }
}

impl fmt::Display for FeatureSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FeatureSetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FeatureSetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == BUILTIN_TAG {
            Ok(FeatureSetId::BuiltIn)
        } else {
            Ok(FeatureSetId::External(raw))
        }
    }
}

/// An external feature set found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSetDir {
    pub id: FeatureSetId,
    /// The feature set's own directory.
    pub path: PathBuf,
    /// The directory holding its rig components.
    pub rigs_path: PathBuf,
}

/// Lists the feature sets installed below `parent`, sorted by name.
///
/// Only directories holding a `rigs_subdir` folder count. Hidden and
/// underscore-prefixed entries are ignored.
pub fn discover_feature_sets(
    parent: &Path,
    rigs_subdir: &str,
) -> Result<Vec<FeatureSetDir>, CatalogError> {
    if !parent.is_dir() {
        return Err(CatalogError::DirectoryNotFound(parent.to_path_buf()));
    }
    let mut sets = Vec::new();
    let walker = WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();
    for entry in walker.filter_map(Result::ok) {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with('.') || name.starts_with('_') || !path.is_dir() {
            continue;
        }
        let rigs_path = path.join(rigs_subdir);
        if !rigs_path.is_dir() {
            debug!("{} has no {} folder, not a feature set", path.display(), rigs_subdir);
            continue;
        }
        let id = match FeatureSetId::external(name) {
            Ok(id) => id,
            Err(err) => {
                debug!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        sets.push(FeatureSetDir {
            id,
            path: path.to_path_buf(),
            rigs_path,
        });
    }
    Ok(sets)
}
