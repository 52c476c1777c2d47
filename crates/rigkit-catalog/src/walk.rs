//! Recursive discovery of rig components below a rigs directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::CatalogError;
use crate::module::{
    ComponentLoader, ComponentModule, LoadedModule, ResourceKind, COMPONENT_EXTENSION,
};
use crate::name::ComponentName;

/// A module the walker kept, shared between the rig and implementation maps.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedComponent {
    pub module: Arc<ComponentModule>,
    pub source: PathBuf,
}

impl From<LoadedModule> for LoadedComponent {
    fn from(loaded: LoadedModule) -> Self {
        Self {
            module: Arc::new(loaded.module),
            source: loaded.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry name is ambiguous with the dotted naming scheme.
    MalformedName,
    /// The source exists but could not be read or parsed.
    LoadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of walking one rigs directory.
#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    /// Modules exposing a generator entry point.
    pub rigs: BTreeMap<ComponentName, LoadedComponent>,
    /// Modules flagged as implementation helpers.
    pub implementations: BTreeMap<ComponentName, LoadedComponent>,
    pub skipped: Vec<SkippedEntry>,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.rigs.is_empty() && self.implementations.is_empty()
    }

    /// Every name found, rigs and helpers alike, in sorted order.
    pub fn names(&self) -> Vec<ComponentName> {
        let mut names: Vec<_> = self
            .rigs
            .keys()
            .chain(self.implementations.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn record(&mut self, name: ComponentName, component: LoadedComponent) {
        if component.module.is_implementation() {
            self.implementations.insert(name.clone(), component.clone());
        }
        if component.module.is_rig() {
            self.rigs.insert(name, component);
        }
    }

    fn merge_prefixed(&mut self, prefix: &ComponentName, nested: ScanOutcome) {
        for (name, component) in nested.rigs {
            self.rigs.insert(prefix.join(&name), component);
        }
        for (name, component) in nested.implementations {
            self.implementations.insert(prefix.join(&name), component);
        }
        self.skipped.extend(nested.skipped);
    }
}

/// Walks `base_path/relative_path` and classifies every component source.
///
/// Returned names are relative to `relative_path`. A missing start directory
/// fails the scan; problems with individual entries are logged and recorded in
/// [`ScanOutcome::skipped`].
pub fn scan<L: ComponentLoader>(
    base_path: &Path,
    relative_path: Option<&ComponentName>,
    loader: &L,
) -> Result<ScanOutcome, CatalogError> {
    let dir = directory_of(base_path, relative_path);
    if !dir.is_dir() {
        return Err(CatalogError::DirectoryNotFound(dir));
    }
    Ok(scan_dir(base_path, relative_path, &dir, loader))
}

fn directory_of(base_path: &Path, relative_path: Option<&ComponentName>) -> PathBuf {
    let mut dir = base_path.to_path_buf();
    if let Some(relative) = relative_path {
        dir.extend(relative.segments());
    }
    dir
}

fn qualified(relative_path: Option<&ComponentName>, local: &ComponentName) -> ComponentName {
    match relative_path {
        Some(relative) => relative.join(local),
        None => local.clone(),
    }
}

fn scan_dir<L: ComponentLoader>(
    base_path: &Path,
    relative_path: Option<&ComponentName>,
    dir: &Path,
    loader: &L,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry in {}: {}", dir.display(), err);
                continue;
            }
        };
        let path = entry.path();
        let Some(file_name) = entry.file_name().to_str() else {
            debug!("skipping non UTF-8 entry {}", path.display());
            continue;
        };
        if file_name.starts_with('.') || file_name.starts_with('_') {
            continue;
        }

        let is_dir = path.is_dir();
        if file_name.matches('.').count() >= 2 || (is_dir && file_name.contains('.')) {
            warn!("{}: name contains a '.', skipping", path.display());
            outcome.skipped.push(SkippedEntry {
                path: path.to_path_buf(),
                reason: SkipReason::MalformedName,
            });
            continue;
        }

        if is_dir {
            let Ok(local) = ComponentName::from_segment(file_name) else {
                continue;
            };
            let package = qualified(relative_path, &local);
            match loader.load(&package, base_path, ResourceKind::Package) {
                Ok(loaded) => outcome.record(local.clone(), loaded.into()),
                Err(err) => note_load_failure(&mut outcome, path, err),
            }
            let nested = scan_dir(base_path, Some(&package), path, loader);
            outcome.merge_prefixed(&local, nested);
        } else if path.extension().and_then(|ext| ext.to_str()) == Some(COMPONENT_EXTENSION) {
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let Ok(local) = ComponentName::from_segment(stem) else {
                continue;
            };
            let candidate = qualified(relative_path, &local);
            match loader.load(&candidate, base_path, ResourceKind::Module) {
                Ok(loaded) => outcome.record(local, loaded.into()),
                Err(err) => note_load_failure(&mut outcome, path, err),
            }
        }
    }

    outcome
}

fn note_load_failure(outcome: &mut ScanOutcome, path: &Path, err: CatalogError) {
    match err {
        CatalogError::SourceMissing { .. } => {}
        CatalogError::Load { reason, .. } => {
            debug!("{} is not a valid component: {}", path.display(), reason);
            outcome.skipped.push(SkippedEntry {
                path: path.to_path_buf(),
                reason: SkipReason::LoadFailed(reason),
            });
        }
        other => {
            debug!("{} is not a valid component: {}", path.display(), other);
            outcome.skipped.push(SkippedEntry {
                path: path.to_path_buf(),
                reason: SkipReason::LoadFailed(other.to_string()),
            });
        }
    }
}
