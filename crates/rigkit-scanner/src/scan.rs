use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use rigkit_catalog::{CatalogConfig, CatalogError, FeatureSetId, LoadSummary, Registry};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Overrides the configured built-in rigs directory.
    pub builtin_root: Option<PathBuf>,
    /// Parent directory of installed feature sets; overrides the configuration.
    pub feature_sets_dir: Option<PathBuf>,
    /// A single external set to load on top, replacing any other external set.
    pub feature_set: Option<(FeatureSetId, PathBuf)>,
}

pub struct ScanResult {
    pub registry: Registry,
    pub summaries: Vec<LoadSummary>,
    /// Installed feature sets that were found but could not be loaded.
    pub failed: Vec<(FeatureSetId, CatalogError)>,
}

pub struct Scanner {
    config: CatalogConfig,
}

impl Scanner {
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    pub fn scan(&self, options: &ScanOptions) -> Result<ScanResult> {
        let mut config = self.config.clone();
        if let Some(root) = &options.builtin_root {
            config.builtin_root = root.clone();
        }
        if let Some(dir) = &options.feature_sets_dir {
            config.feature_sets_dir = Some(dir.clone());
        }

        let mut registry = Registry::new(config);
        let mut summaries = vec![registry.load_builtin().with_context(|| {
            format!(
                "failed to load built-in rigs from {}",
                registry.config().builtin_root.display()
            )
        })?];

        let mut failed = Vec::new();
        match registry.load_configured_feature_sets() {
            Ok(report) => {
                summaries.extend(report.loaded);
                failed = report.failed;
            }
            // The default feature sets folder only exists once a user installs one.
            Err(err) if options.feature_sets_dir.is_none() => {
                warn!("no feature sets loaded: {err}");
            }
            Err(err) => return Err(err).context("failed to load feature sets"),
        }

        if let Some((id, dir)) = &options.feature_set {
            let summary = registry.load_external(id.clone(), dir).with_context(|| {
                format!("failed to load feature set {id} from {}", dir.display())
            })?;
            summaries.push(summary);
        }

        Ok(ScanResult {
            registry,
            summaries,
            failed,
        })
    }
}
