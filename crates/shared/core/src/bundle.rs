use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named bundles handed over by the framework on start and save
pub type Bundles = HashMap<String, Bundle>;

/// Opaque key/value state container owned by the framework
///
/// The gateway keeps no state across restarts, so it only ever passes
/// bundles through; their contents arrive and leave via serde.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    entries: BTreeMap<String, String>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
