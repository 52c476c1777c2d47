use std::path::PathBuf;

use serde::Serialize;

use rigkit_catalog::{
    CatalogError, ComponentName, ComponentRecord, FeatureSetId, LoadSummary, ParameterDef,
    Registry, SkipReason,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComponentEntry {
    pub name: ComponentName,
    pub feature_set: FeatureSetId,
    pub selectable: bool,
    pub implementation: bool,
    pub entry: Option<String>,
    pub description: Option<String>,
    pub source: PathBuf,
}

impl From<&ComponentRecord> for ComponentEntry {
    fn from(record: &ComponentRecord) -> Self {
        let generator = record.generator();
        Self {
            name: record.name.clone(),
            feature_set: record.feature_set.clone(),
            selectable: record.is_selectable(),
            implementation: record.implementation,
            entry: generator.map(|generator| generator.entry.clone()),
            description: generator
                .and_then(|generator| generator.description.clone())
                .or_else(|| record.module.description.clone()),
            source: record.source.clone(),
        }
    }
}

/// Full details for a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentDetail {
    #[serde(flatten)]
    pub entry: ComponentEntry,
    pub parameters: Vec<ParameterDef>,
}

impl From<&ComponentRecord> for ComponentDetail {
    fn from(record: &ComponentRecord) -> Self {
        Self {
            entry: ComponentEntry::from(record),
            parameters: record.module.parameters().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedReport {
    pub path: PathBuf,
    pub reason: String,
}

/// A feature set that could not be loaded at all.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedSetReport {
    pub feature_set: FeatureSetId,
    pub reason: String,
}

/// Everything a scan produced, ready to print.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    pub components: Vec<ComponentEntry>,
    pub collections: Vec<String>,
    pub skipped: Vec<SkippedReport>,
    pub failed_sets: Vec<FailedSetReport>,
}

impl CatalogReport {
    pub fn new(registry: &Registry, summaries: &[LoadSummary]) -> Self {
        let skipped = summaries
            .iter()
            .flat_map(|summary| summary.skipped.iter())
            .map(|entry| SkippedReport {
                path: entry.path.clone(),
                reason: match &entry.reason {
                    SkipReason::MalformedName => "name contains a '.'".to_string(),
                    SkipReason::LoadFailed(reason) => reason.clone(),
                },
            })
            .collect();
        Self {
            components: registry.records().map(ComponentEntry::from).collect(),
            collections: registry.list_collections(),
            skipped,
            failed_sets: Vec::new(),
        }
    }

    pub fn with_failed_sets(mut self, failed: &[(FeatureSetId, CatalogError)]) -> Self {
        self.failed_sets = failed
            .iter()
            .map(|(feature_set, err)| FailedSetReport {
                feature_set: feature_set.clone(),
                reason: err.to_string(),
            })
            .collect();
        self
    }

    pub fn selectable(&self) -> impl Iterator<Item = &ComponentEntry> {
        self.components.iter().filter(|entry| entry.selectable)
    }
}
