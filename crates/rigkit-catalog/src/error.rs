use std::path::PathBuf;

use thiserror::Error;

use crate::name::ComponentName;

/// Errors raised while loading components or mutating the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed component name {name:?}: {reason}")]
    MalformedName { name: String, reason: &'static str },
    #[error("component {0} is not registered")]
    NotFound(ComponentName),
    #[error("no component source for {name} at {}", path.display())]
    SourceMissing { name: ComponentName, path: PathBuf },
    #[error("failed to load component {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    #[error("rig directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("feature set {0:?} is reserved for the built-in library")]
    ReservedFeatureSet(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether the error only concerns a single entry and a scan may continue.
    pub fn is_entry_local(&self) -> bool {
        matches!(
            self,
            CatalogError::MalformedName { .. }
                | CatalogError::SourceMissing { .. }
                | CatalogError::Load { .. }
        )
    }
}
