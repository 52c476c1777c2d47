use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collection::{collection_filter_items, derive_collections, CollectionFilter};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::feature_set::{discover_feature_sets, FeatureSetDir, FeatureSetId};
use crate::module::{
    ComponentLoader, ComponentModule, JsonComponentLoader, ParameterDef, RigGenerator,
};
use crate::name::ComponentName;
use crate::walk::{scan, LoadedComponent, ScanOutcome, SkippedEntry};

/// A registered component and the feature set that supplied it.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentRecord {
    pub name: ComponentName,
    #[serde(skip)]
    pub module: Arc<ComponentModule>,
    /// Helper module hidden from the rig type list.
    pub implementation: bool,
    pub feature_set: FeatureSetId,
    pub source: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

impl ComponentRecord {
    fn new(name: ComponentName, component: LoadedComponent, feature_set: FeatureSetId) -> Self {
        Self {
            implementation: component.module.is_implementation(),
            name,
            module: component.module,
            feature_set,
            source: component.source,
            loaded_at: Utc::now(),
        }
    }

    pub fn generator(&self) -> Option<&RigGenerator> {
        self.module.generator.as_ref()
    }

    /// Whether users may assign this component to a bone.
    pub fn is_selectable(&self) -> bool {
        self.module.is_rig() && !self.implementation
    }
}

/// What one load operation added to the catalog.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub feature_set: FeatureSetId,
    pub root: PathBuf,
    pub rigs: usize,
    pub implementations: usize,
    /// Names that replaced an entry owned by another feature set.
    pub overridden: Vec<ComponentName>,
    pub skipped: Vec<SkippedEntry>,
}

/// Outcome of loading every installed feature set.
#[derive(Debug, Default)]
pub struct FeatureSetsReport {
    pub loaded: Vec<LoadSummary>,
    /// Sets that were found but could not be scanned.
    pub failed: Vec<(FeatureSetId, CatalogError)>,
}

impl FeatureSetsReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Catalog of every rig component known to the add-on.
///
/// Populated from the built-in library with [`Registry::load_builtin`] and
/// extended with external feature sets. Later registrations of a name replace
/// earlier ones.
#[derive(Debug)]
pub struct Registry<L = JsonComponentLoader> {
    config: CatalogConfig,
    loader: L,
    records: BTreeMap<ComponentName, ComponentRecord>,
}

impl Registry<JsonComponentLoader> {
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_loader(config, JsonComponentLoader)
    }
}

impl<L: ComponentLoader> Registry<L> {
    pub fn with_loader(config: CatalogConfig, loader: L) -> Self {
        Self {
            config,
            loader,
            records: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Rescans the built-in library and makes it the whole catalog.
    ///
    /// External entries are dropped as well; the catalog is left untouched if
    /// the built-in directory is missing.
    pub fn load_builtin(&mut self) -> Result<LoadSummary, CatalogError> {
        let root = self.config.builtin_root.clone();
        let outcome = scan(&root, None, &self.loader)?;
        self.records.clear();
        let summary = self.merge(FeatureSetId::BuiltIn, root, outcome);
        info!(
            "loaded {} built-in rigs and {} implementation modules",
            summary.rigs, summary.implementations
        );
        Ok(summary)
    }

    /// Drops every external entry, then merges the components found in `dir`
    /// tagged with `set_id`. `dir` is scanned as given; for an installed
    /// feature set pass its rigs folder ([`FeatureSetDir::rigs_path`]).
    ///
    /// [`FeatureSetDir::rigs_path`]: crate::FeatureSetDir::rigs_path
    ///
    /// All external sets are purged, not only `set_id`. Entries whose name
    /// already exists, built-in ones included, are replaced.
    pub fn load_external(
        &mut self,
        set_id: FeatureSetId,
        dir: impl AsRef<Path>,
    ) -> Result<LoadSummary, CatalogError> {
        if set_id.is_builtin() {
            return Err(CatalogError::ReservedFeatureSet(set_id.to_string()));
        }
        self.purge_external();
        let root = dir.as_ref().to_path_buf();
        let outcome = scan(&root, None, &self.loader)?;
        let summary = self.merge(set_id, root, outcome);
        info!(
            "loaded feature set {}: {} rigs, {} implementation modules",
            summary.feature_set, summary.rigs, summary.implementations
        );
        Ok(summary)
    }

    /// Replaces all external entries with the feature sets installed below
    /// `parent`.
    pub fn load_feature_sets(
        &mut self,
        parent: impl AsRef<Path>,
    ) -> Result<FeatureSetsReport, CatalogError> {
        let sets = discover_feature_sets(parent.as_ref(), &self.config.rigs_subdir)?;
        Ok(self.load_feature_set_dirs(sets))
    }

    /// Replaces all external entries with the given feature sets, each
    /// scanned from its rigs folder. A set that fails to scan is logged,
    /// reported in [`FeatureSetsReport::failed`] and left out.
    pub fn load_feature_set_dirs(&mut self, sets: Vec<FeatureSetDir>) -> FeatureSetsReport {
        self.purge_external();
        let mut report = FeatureSetsReport::default();
        for set in sets {
            match scan(&set.rigs_path, None, &self.loader) {
                Ok(outcome) => report
                    .loaded
                    .push(self.merge(set.id, set.rigs_path, outcome)),
                Err(err) => {
                    warn!("failed to load feature set {}: {}", set.id, err);
                    report.failed.push((set.id, err));
                }
            }
        }
        report
    }

    /// Loads the feature sets from the configured directory, if any.
    pub fn load_configured_feature_sets(&mut self) -> Result<FeatureSetsReport, CatalogError> {
        match self.config.feature_sets_dir.clone() {
            Some(dir) => self.load_feature_sets(dir),
            None => Ok(FeatureSetsReport::default()),
        }
    }

    /// Removes the entries of one external feature set.
    pub fn unload_feature_set(&mut self, set_id: &FeatureSetId) -> Result<usize, CatalogError> {
        if set_id.is_builtin() {
            return Err(CatalogError::ReservedFeatureSet(set_id.to_string()));
        }
        let before = self.records.len();
        self.records.retain(|_, record| &record.feature_set != set_id);
        Ok(before - self.records.len())
    }

    /// Removes every entry not owned by the built-in library.
    pub fn purge_external(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.feature_set.is_builtin());
        let removed = before - self.records.len();
        if removed > 0 {
            debug!("purged {} external components", removed);
        }
        removed
    }

    /// Clears the catalog.
    pub fn teardown(&mut self) {
        self.records.clear();
    }

    fn merge(
        &mut self,
        feature_set: FeatureSetId,
        root: PathBuf,
        outcome: ScanOutcome,
    ) -> LoadSummary {
        let ScanOutcome {
            rigs,
            implementations,
            skipped,
        } = outcome;
        let mut summary = LoadSummary {
            feature_set: feature_set.clone(),
            root,
            rigs: rigs.len(),
            implementations: implementations.len(),
            overridden: Vec::new(),
            skipped,
        };
        // A module in both maps is one record.
        let mut components = implementations;
        components.extend(rigs);
        for (name, component) in components {
            let record = ComponentRecord::new(name.clone(), component, feature_set.clone());
            if let Some(previous) = self.records.insert(name.clone(), record) {
                if previous.feature_set != feature_set {
                    debug!("{} from {} overrides {}", name, feature_set, previous.feature_set);
                    summary.overridden.push(name);
                }
            }
        }
        summary
    }

    pub fn get(&self, name: &ComponentName) -> Result<&ComponentRecord, CatalogError> {
        self.records
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.clone()))
    }

    /// Looks up a name given as text, e.g. a bone's rig type property.
    pub fn get_str(&self, name: &str) -> Result<&ComponentRecord, CatalogError> {
        let name = ComponentName::new(name)?;
        self.get(&name)
    }

    pub fn contains(&self, name: &ComponentName) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.records.values()
    }

    /// Rig types users can pick, sorted.
    pub fn list_selectable(&self) -> Vec<ComponentName> {
        self.records
            .values()
            .filter(|record| record.is_selectable())
            .map(|record| record.name.clone())
            .collect()
    }

    pub fn list_selectable_in(&self, filter: &CollectionFilter) -> Vec<ComponentName> {
        self.list_selectable()
            .into_iter()
            .filter(|name| filter.matches(name))
            .collect()
    }

    pub fn list_implementations(&self) -> Vec<ComponentName> {
        self.records
            .values()
            .filter(|record| record.implementation)
            .map(|record| record.name.clone())
            .collect()
    }

    pub fn list_collections(&self) -> Vec<String> {
        derive_collections(&self.list_selectable())
    }

    pub fn collection_filter_items(&self) -> Vec<CollectionFilter> {
        collection_filter_items(&self.list_collections())
    }

    /// Parameters each selectable rig registers in the bone properties panel.
    pub fn parameter_schema(&self) -> BTreeMap<ComponentName, Vec<ParameterDef>> {
        self.records
            .values()
            .filter(|record| record.is_selectable())
            .filter(|record| !record.module.parameters().is_empty())
            .map(|record| (record.name.clone(), record.module.parameters().to_vec()))
            .collect()
    }

    /// Feature sets that currently own at least one entry.
    pub fn feature_sets(&self) -> BTreeSet<FeatureSetId> {
        self.records
            .values()
            .map(|record| record.feature_set.clone())
            .collect()
    }
}

/// Registry handle for hosts that touch the catalog from several threads.
///
/// Mutations take the write lock for their whole duration so readers never
/// see a catalog in the middle of a purge.
#[derive(Debug)]
pub struct SharedRegistry<L = JsonComponentLoader> {
    inner: Arc<RwLock<Registry<L>>>,
}

impl<L> Clone for SharedRegistry<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ComponentLoader> SharedRegistry<L> {
    pub fn new(registry: Registry<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Registry<L>> {
        self.inner.read()
    }

    pub fn load_builtin(&self) -> Result<LoadSummary, CatalogError> {
        self.inner.write().load_builtin()
    }

    pub fn load_external(
        &self,
        set_id: FeatureSetId,
        dir: impl AsRef<Path>,
    ) -> Result<LoadSummary, CatalogError> {
        self.inner.write().load_external(set_id, dir)
    }

    pub fn load_feature_sets(
        &self,
        parent: impl AsRef<Path>,
    ) -> Result<FeatureSetsReport, CatalogError> {
        self.inner.write().load_feature_sets(parent)
    }

    pub fn load_configured_feature_sets(&self) -> Result<FeatureSetsReport, CatalogError> {
        self.inner.write().load_configured_feature_sets()
    }

    pub fn unload_feature_set(&self, set_id: &FeatureSetId) -> Result<usize, CatalogError> {
        self.inner.write().unload_feature_set(set_id)
    }

    pub fn teardown(&self) {
        self.inner.write().teardown();
    }

    pub fn get(&self, name: &ComponentName) -> Result<ComponentRecord, CatalogError> {
        self.inner.read().get(name).cloned()
    }

    pub fn list_selectable(&self) -> Vec<ComponentName> {
        self.inner.read().list_selectable()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, write};
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::config::RIGS_SUBDIR;

    const RIG: &str = r#"{ "rig": {} }"#;

    fn strings(names: Vec<ComponentName>) -> Vec<String> {
        names.into_iter().map(|name| name.to_string()).collect()
    }

    fn install() -> (TempDir, Registry) {
        let dir = tempdir().unwrap();
        let rigs = dir.path().join("rigs");
        create_dir_all(rigs.join("limbs")).unwrap();
        write(rigs.join("limbs/arm.rig"), RIG).unwrap();
        write(rigs.join("limbs/_base.rig"), RIG).unwrap();
        write(rigs.join("spine.rig"), RIG).unwrap();
        let registry = Registry::new(CatalogConfig::for_install(dir.path()));
        (dir, registry)
    }

    fn external(root: &Path, files: &[(&str, &str)]) {
        create_dir_all(root).unwrap();
        for (file, content) in files {
            let path = root.join(file);
            create_dir_all(path.parent().unwrap()).unwrap();
            write(path, content).unwrap();
        }
    }

    #[test]
    fn builtin_load_lists_rigs_and_collections() {
        let (_dir, mut registry) = install();
        let summary = registry.load_builtin().unwrap();
        assert_eq!(summary.rigs, 2);
        assert_eq!(strings(registry.list_selectable()), vec!["limbs.arm", "spine"]);
        assert_eq!(registry.list_collections(), vec!["limbs"]);
        let spine = registry.get_str("spine").unwrap();
        assert_eq!(spine.feature_set, FeatureSetId::BuiltIn);
    }

    #[test]
    fn external_load_purges_every_other_external_set() {
        let (dir, mut registry) = install();
        registry.load_builtin().unwrap();
        let mysets = dir.path().join("mysets");
        external(&mysets, &[("tail.rig", RIG)]);
        let other = dir.path().join("other");
        external(&other, &[]);

        let mysets_id = FeatureSetId::external("mysets").unwrap();
        registry.load_external(mysets_id.clone(), &mysets).unwrap();
        assert_eq!(registry.get_str("tail").unwrap().feature_set, mysets_id);

        registry
            .load_external(FeatureSetId::external("other").unwrap(), &other)
            .unwrap();
        assert!(matches!(
            registry.get_str("tail"),
            Err(CatalogError::NotFound(_))
        ));
        assert_eq!(strings(registry.list_selectable()), vec!["limbs.arm", "spine"]);
    }

    #[test]
    fn external_overrides_builtin_until_builtin_reload() {
        let (dir, mut registry) = install();
        registry.load_builtin().unwrap();
        let set = dir.path().join("custom");
        external(&set, &[("spine.rig", r#"{ "rig": { "entry": "CustomSpine" } }"#)]);

        let id = FeatureSetId::external("custom").unwrap();
        let summary = registry.load_external(id.clone(), &set).unwrap();
        assert_eq!(strings(summary.overridden), vec!["spine"]);
        let spine = registry.get_str("spine").unwrap();
        assert_eq!(spine.feature_set, id);
        assert_eq!(spine.generator().unwrap().entry, "CustomSpine");

        registry.load_builtin().unwrap();
        assert_eq!(registry.feature_sets(), BTreeSet::from([FeatureSetId::BuiltIn]));
        assert_eq!(strings(registry.list_selectable()), vec!["limbs.arm", "spine"]);
        assert_eq!(registry.get_str("spine").unwrap().generator().unwrap().entry, "Rig");
    }

    #[test]
    fn implementation_modules_are_loaded_but_not_selectable() {
        let (dir, mut registry) = install();
        write(
            dir.path().join("rigs/limbs/limb_rigs.rig"),
            r#"{ "rig": {}, "implementation": true }"#,
        )
        .unwrap();
        write(
            dir.path().join("rigs/chain_utils.rig"),
            r#"{ "implementation": true }"#,
        )
        .unwrap();
        registry.load_builtin().unwrap();

        assert_eq!(
            strings(registry.list_implementations()),
            vec!["chain_utils", "limbs.limb_rigs"]
        );
        assert_eq!(strings(registry.list_selectable()), vec!["limbs.arm", "spine"]);
        assert!(registry.get_str("chain_utils").unwrap().implementation);
    }

    #[test]
    fn reserved_and_missing_directories_fail() {
        let (dir, mut registry) = install();
        registry.load_builtin().unwrap();
        assert!(matches!(
            registry.load_external(FeatureSetId::BuiltIn, dir.path()),
            Err(CatalogError::ReservedFeatureSet(_))
        ));
        assert!(matches!(
            registry.unload_feature_set(&FeatureSetId::BuiltIn),
            Err(CatalogError::ReservedFeatureSet(_))
        ));
        let missing = registry.load_external(
            FeatureSetId::external("ghost").unwrap(),
            dir.path().join("ghost"),
        );
        assert!(matches!(missing, Err(CatalogError::DirectoryNotFound(_))));
        assert_eq!(registry.len(), 2);

        let mut empty = Registry::new(CatalogConfig::for_install(dir.path().join("nowhere")));
        assert!(matches!(
            empty.load_builtin(),
            Err(CatalogError::DirectoryNotFound(_))
        ));
        assert!(empty.is_empty());
    }

    #[test]
    fn feature_sets_load_side_by_side_and_unload_individually() {
        let (dir, mut registry) = install();
        registry.load_builtin().unwrap();
        let parent = dir.path().join("feature_sets");
        external(&parent.join("animals/rigs"), &[("tail.rig", RIG)]);
        external(&parent.join("faces/rigs/face"), &[("jaw.rig", RIG)]);

        let report = registry.load_feature_sets(&parent).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.loaded.len(), 2);
        assert_eq!(
            strings(registry.list_selectable()),
            vec!["face.jaw", "limbs.arm", "spine", "tail"]
        );
        assert_eq!(registry.list_collections(), vec!["face", "limbs"]);

        let removed = registry
            .unload_feature_set(&FeatureSetId::external("animals").unwrap())
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!registry.contains(&ComponentName::new("tail").unwrap()));
        assert!(registry.contains(&ComponentName::new("face.jaw").unwrap()));
    }

    #[test]
    fn external_directory_is_scanned_as_given() {
        let (dir, mut registry) = install();
        registry.load_builtin().unwrap();
        let set = dir.path().join("loose");
        external(&set, &[("tail.rig", RIG), ("rigs/foo.rig", RIG)]);

        let summary = registry
            .load_external(FeatureSetId::external("loose").unwrap(), &set)
            .unwrap();
        assert_eq!(summary.root, set);
        assert_eq!(summary.rigs, 2);
        assert_eq!(
            strings(registry.list_selectable()),
            vec!["limbs.arm", "rigs.foo", "spine", "tail"]
        );
    }

    #[test]
    fn unreadable_feature_set_is_reported_and_others_still_load() {
        let (dir, mut registry) = install();
        registry.load_builtin().unwrap();
        let parent = dir.path().join("feature_sets");
        external(&parent.join("animals/rigs"), &[("tail.rig", RIG)]);
        let mut sets = discover_feature_sets(&parent, RIGS_SUBDIR).unwrap();
        let gone = parent.join("vanished");
        sets.push(FeatureSetDir {
            id: FeatureSetId::external("vanished").unwrap(),
            rigs_path: gone.join(RIGS_SUBDIR),
            path: gone,
        });

        let report = registry.load_feature_set_dirs(sets);
        assert!(!report.is_complete());
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        let (failed_id, err) = &report.failed[0];
        assert_eq!(failed_id.as_str(), "vanished");
        assert!(matches!(err, CatalogError::DirectoryNotFound(_)));
        assert!(registry.contains(&ComponentName::new("tail").unwrap()));
    }

    #[test]
    fn filters_and_parameter_schema() {
        let (dir, mut registry) = install();
        write(
            dir.path().join("rigs/limbs/leg.rig"),
            serde_json::json!({
                "rig": {
                    "parameters": [
                        { "name": "foot_roll", "kind": "bool", "default": true },
                        { "name": "pivot", "kind": "enum", "items": ["ankle", "toe"] }
                    ]
                }
            })
            .to_string(),
        )
        .unwrap();
        registry.load_builtin().unwrap();

        let limbs = CollectionFilter::Named("limbs".into());
        assert_eq!(
            strings(registry.list_selectable_in(&limbs)),
            vec!["limbs.arm", "limbs.leg"]
        );
        assert_eq!(
            strings(registry.list_selectable_in(&CollectionFilter::None)),
            vec!["spine"]
        );
        let labels: Vec<_> = registry
            .collection_filter_items()
            .into_iter()
            .map(|item| item.to_string())
            .collect();
        assert_eq!(labels, vec!["All", "None", "limbs"]);

        let schema = registry.parameter_schema();
        assert_eq!(schema.len(), 1);
        let leg = &schema[&ComponentName::new("limbs.leg").unwrap()];
        assert_eq!(leg[1].items, vec!["ankle", "toe"]);
    }

    #[test]
    fn teardown_clears_and_shared_handle_sees_updates() {
        let (_dir, registry) = install();
        let shared = SharedRegistry::new(registry);
        let reader = shared.clone();
        shared.load_builtin().unwrap();
        assert_eq!(reader.list_selectable().len(), 2);
        assert!(reader.get(&ComponentName::new("spine").unwrap()).is_ok());
        shared.teardown();
        assert!(reader.read().is_empty());
    }

    #[test]
    fn shared_handle_loads_and_unloads_configured_sets() {
        let dir = tempdir().unwrap();
        external(&dir.path().join("rigs"), &[("spine.rig", RIG)]);
        let parent = dir.path().join("feature_sets");
        external(&parent.join("animals/rigs"), &[("tail.rig", RIG)]);
        let config = CatalogConfig::for_install(dir.path()).with_feature_sets_dir(parent.clone());
        let shared = SharedRegistry::new(Registry::new(config));
        let reader = shared.clone();

        shared.load_builtin().unwrap();
        let report = shared.load_configured_feature_sets().unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(strings(reader.list_selectable()), vec!["spine", "tail"]);

        let animals = FeatureSetId::external("animals").unwrap();
        assert_eq!(shared.unload_feature_set(&animals).unwrap(), 1);
        assert_eq!(strings(reader.list_selectable()), vec!["spine"]);
        assert!(matches!(
            shared.unload_feature_set(&FeatureSetId::BuiltIn),
            Err(CatalogError::ReservedFeatureSet(_))
        ));
    }
}
