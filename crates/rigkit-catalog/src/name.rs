use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CatalogError;

/// Separator between the segments of a [`ComponentName`].
pub const SEPARATOR: char = '.';

/// Dotted path naming a rig component, mirroring its nesting on disk
/// (`limbs.arm` lives at `limbs/arm.rig`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentName(String);

impl ComponentName {
    pub fn new(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        if name.is_empty() {
            return Err(malformed(name, "name is empty"));
        }
        for segment in name.split(SEPARATOR) {
            validate_segment(&name, segment)?;
        }
        Ok(Self(name))
    }

    /// Builds a single-segment name from a file stem or directory name.
    pub fn from_segment(segment: &str) -> Result<Self, CatalogError> {
        if segment.contains(SEPARATOR) {
            return Err(malformed(segment.to_string(), "segment contains a '.'"));
        }
        validate_segment(segment, segment)?;
        Ok(Self(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    pub fn first_segment(&self) -> &str {
        self.segments().next().unwrap_or(&self.0)
    }

    /// Last segment, i.e. the file stem or directory name.
    pub fn leaf(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// Appends `child` below this name: `limbs` + `arm` is `limbs.arm`.
    pub fn join(&self, child: &ComponentName) -> ComponentName {
        ComponentName(format!("{}{SEPARATOR}{}", self.0, child.0))
    }

    /// Name of the enclosing package, if any.
    pub fn parent(&self) -> Option<ComponentName> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| ComponentName(parent.to_string()))
    }
}

fn validate_segment(name: &str, segment: &str) -> Result<(), CatalogError> {
    match segment.chars().next() {
        None => Err(malformed(name.to_string(), "empty path segment")),
        Some('_') => Err(malformed(name.to_string(), "segment starts with '_'")),
        Some(_) if segment.contains(std::path::MAIN_SEPARATOR) || segment.contains('/') => {
            Err(malformed(name.to_string(), "segment contains a path separator"))
        }
        Some(_) => Ok(()),
    }
}

fn malformed(name: String, reason: &'static str) -> CatalogError {
    CatalogError::MalformedName { name, reason }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ComponentName {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl AsRef<str> for ComponentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ComponentName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ComponentName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ComponentName::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn accepts_nested_names() {
        let name = ComponentName::new("limbs.super_arm").unwrap();
        assert_eq!(name.segments().collect::<Vec<_>>(), vec!["limbs", "super_arm"]);
        assert_eq!(name.first_segment(), "limbs");
        assert_eq!(name.leaf(), "super_arm");
        assert_eq!(name.parent().unwrap().as_str(), "limbs");
    }

    #[test]
    fn rejects_reserved_and_empty_segments() {
        for bad in ["", "_base", "limbs._base", "limbs..arm", ".hidden", "limbs.", "a/b"] {
            let err = ComponentName::new(bad).unwrap_err();
            assert!(
                matches!(err, CatalogError::MalformedName { .. }),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn join_prefixes_child() {
        let parent = ComponentName::from_segment("limbs").unwrap();
        let child = ComponentName::new("arm").unwrap();
        assert_eq!(parent.join(&child).to_string(), "limbs.arm");
        assert!(ComponentName::from_segment("arm.ik").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let name: ComponentName = serde_json::from_str("\"spine\"").unwrap();
        assert_eq!(name.as_str(), "spine");
        assert!(serde_json::from_str::<ComponentName>("\"_private\"").is_err());
    }
}
