use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::name::ComponentName;

/// Distinct first segments of all nested names, in first-seen order.
///
/// Top-level names (`spine`) belong to no collection.
pub fn derive_collections<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ComponentName>,
{
    let mut collections = IndexSet::new();
    for name in names {
        if name.segment_count() >= 2 {
            collections.insert(name.first_segment());
        }
    }
    collections.into_iter().map(str::to_string).collect()
}

/// Category filter offered next to the rig type list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionFilter {
    #[default]
    All,
    /// Only top-level rigs that belong to no collection.
    None,
    Named(String),
}

impl CollectionFilter {
    pub fn matches(&self, name: &ComponentName) -> bool {
        match self {
            CollectionFilter::All => true,
            CollectionFilter::None => name.segment_count() == 1,
            CollectionFilter::Named(collection) => {
                name.segment_count() >= 2 && name.first_segment() == collection
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CollectionFilter::All => "All",
            CollectionFilter::None => "None",
            CollectionFilter::Named(collection) => collection,
        }
    }
}

impl fmt::Display for CollectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Filter choices for the UI: `All`, `None`, then one per collection.
pub fn collection_filter_items(collections: &[String]) -> Vec<CollectionFilter> {
    let mut items = vec![CollectionFilter::All, CollectionFilter::None];
    items.extend(collections.iter().cloned().map(CollectionFilter::Named));
    items
}
