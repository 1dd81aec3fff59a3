//! Aggregate counts over a snapshot

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::Asset;

/// Key holding the snapshot size
pub const TOTAL_KEY: &str = "total";

/// Asset counts keyed by `"total"` and by source name
///
/// `"total"` always comes first, followed by each source present in the
/// snapshot in order of first appearance. Sources without assets are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InventoryStats(IndexMap<String, usize>);

impl InventoryStats {
    /// Count assets by source
    #[must_use]
    pub fn from_assets(assets: &[Asset]) -> Self {
        let mut counts = IndexMap::new();
        counts.insert(TOTAL_KEY.to_string(), assets.len());
        for asset in assets {
            *counts.entry(asset.source().to_string()).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Total number of assets
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.get(TOTAL_KEY).copied().unwrap_or(0)
    }

    /// Count for a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<usize> {
        self.0.get(key).copied()
    }

    /// Number of keys, `"total"` included
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over source entries, skipping `"total"`
    pub fn sources(&self) -> impl Iterator<Item = (&str, usize)> {
        self.iter().filter(|(key, _)| *key != TOTAL_KEY)
    }

    /// Iterate over all entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(key, count)| (key.as_str(), *count))
    }
}

impl fmt::Display for InventoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, count)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "\"{key}\": {count}")?;
        }
        f.write_str("}")
    }
}
