use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::name::ComponentName;

/// File extension of component source files.
pub const COMPONENT_EXTENSION: &str = "rig";

/// File stem of the module describing a package directory itself.
pub const PACKAGE_MODULE: &str = "_init";

/// Symbol the generation engine dispatches to when a module does not name one.
pub const DEFAULT_ENTRY: &str = "Rig";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A plain component file: `limbs/arm.rig`.
    Module,
    /// The package-root module of a directory: `limbs/_init.rig`.
    Package,
}

impl ResourceKind {
    /// Location of `name` below `base_path` for this kind of resource.
    pub fn source_path(self, name: &ComponentName, base_path: &Path) -> PathBuf {
        let mut path = base_path.to_path_buf();
        path.extend(name.segments());
        match self {
            ResourceKind::Module => {
                path.set_extension(COMPONENT_EXTENSION);
            }
            ResourceKind::Package => {
                path.push(PACKAGE_MODULE);
                path.set_extension(COMPONENT_EXTENSION);
            }
        }
        path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Bool,
    Int,
    Float,
    String,
    Enum,
}

/// A per-component option exposed in the bone properties panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values for [`ParameterKind::Enum`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

/// The generation entry point of a rig component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigGenerator {
    #[serde(default = "default_entry")]
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDef>,
}

fn default_entry() -> String {
    DEFAULT_ENTRY.to_string()
}

/// What a loaded component source provides.
///
/// A module exposing `rig` is selectable by users. A module carrying
/// `implementation: true` is a helper other components build on and is hidden
/// from selection. A module with neither is ignored by the walker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentModule {
    #[serde(default, rename = "rig", skip_serializing_if = "Option::is_none")]
    pub generator: Option<RigGenerator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ComponentModule {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn is_rig(&self) -> bool {
        self.generator.is_some()
    }

    pub fn is_implementation(&self) -> bool {
        self.implementation.unwrap_or(false)
    }

    pub fn parameters(&self) -> &[ParameterDef] {
        self.generator
            .as_ref()
            .map(|generator| generator.parameters.as_slice())
            .unwrap_or_default()
    }
}

/// A module resolved from disk together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub module: ComponentModule,
    pub source: PathBuf,
}

/// Resolves dotted component names to loaded modules.
pub trait ComponentLoader {
    fn load(
        &self,
        name: &ComponentName,
        base_path: &Path,
        kind: ResourceKind,
    ) -> Result<LoadedModule, CatalogError>;
}

/// Loads `.rig` JSON documents straight from the filesystem on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonComponentLoader;

impl ComponentLoader for JsonComponentLoader {
    fn load(
        &self,
        name: &ComponentName,
        base_path: &Path,
        kind: ResourceKind,
    ) -> Result<LoadedModule, CatalogError> {
        let source = kind.source_path(name, base_path);
        let raw = match fs::read_to_string(&source) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CatalogError::SourceMissing {
                    name: name.clone(),
                    path: source,
                });
            }
            Err(err) => {
                return Err(CatalogError::Load {
                    path: source,
                    reason: err.to_string(),
                });
            }
        };
        let module = ComponentModule::parse(&raw).map_err(|err| CatalogError::Load {
            path: source.clone(),
            reason: err.to_string(),
        })?;
        Ok(LoadedModule { module, source })
    }
}

/// Loads the component `name` below `base_path` with the on-disk loader.
pub fn resolve(
    name: &ComponentName,
    base_path: &Path,
    kind: ResourceKind,
) -> Result<ComponentModule, CatalogError> {
    JsonComponentLoader
        .load(name, base_path, kind)
        .map(|loaded| loaded.module)
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, write};

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn resolves_nested_module() {
        let dir = tempdir().unwrap();
        create_dir_all(dir.path().join("limbs")).unwrap();
        write(
            dir.path().join("limbs/arm.rig"),
            serde_json::json!({
                "rig": {
                    "description": "Two bone IK/FK arm",
                    "parameters": [{ "name": "segments", "kind": "int", "default": 2 }]
                }
            })
            .to_string(),
        )
        .unwrap();

        let name = ComponentName::new("limbs.arm").unwrap();
        let module = resolve(&name, dir.path(), ResourceKind::Module).unwrap();
        let generator = module.generator.as_ref().unwrap();
        assert_eq!(generator.entry, DEFAULT_ENTRY);
        assert_eq!(module.parameters().len(), 1);
        assert_eq!(module.parameters()[0].kind, ParameterKind::Int);
        assert!(!module.is_implementation());
    }

    #[test]
    fn package_kind_reads_init_module() {
        let dir = tempdir().unwrap();
        create_dir_all(dir.path().join("tentacle")).unwrap();
        write(
            dir.path().join("tentacle/_init.rig"),
            r#"{ "rig": { "entry": "TentacleRig" } }"#,
        )
        .unwrap();

        let name = ComponentName::new("tentacle").unwrap();
        let module = resolve(&name, dir.path(), ResourceKind::Package).unwrap();
        assert_eq!(module.generator.unwrap().entry, "TentacleRig");
    }

    #[test]
    fn missing_and_broken_sources_are_distinguished() {
        let dir = tempdir().unwrap();
        write(dir.path().join("broken.rig"), "{ not json").unwrap();

        let missing = ComponentName::new("absent").unwrap();
        assert!(matches!(
            resolve(&missing, dir.path(), ResourceKind::Module),
            Err(CatalogError::SourceMissing { .. })
        ));

        let broken = ComponentName::new("broken").unwrap();
        let err = resolve(&broken, dir.path(), ResourceKind::Module).unwrap_err();
        assert!(matches!(err, CatalogError::Load { .. }));
        assert!(err.is_entry_local());
    }

    #[test]
    fn module_without_markers_is_neither_rig_nor_helper() {
        let module = ComponentModule::parse(r#"{ "description": "shared maths" }"#).unwrap();
        assert!(!module.is_rig());
        assert!(!module.is_implementation());
    }
}
