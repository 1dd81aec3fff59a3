//! `InventoryManager`: snapshot ownership and queries
//!
//! Holds the registry of source adapters and the most recent snapshot of
//! assets. A pull builds a complete replacement snapshot before publishing
//! it, so readers never observe a partially populated inventory.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::CoreError;
use crate::source::InventorySource;
use crate::stats::{InventoryStats, TOTAL_KEY};
use crate::types::{ALL_SOURCES, Asset, Selector};

/// What a failed pull does to the published snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullFailurePolicy {
    /// Keep the previous snapshot published
    #[default]
    RestorePrevious,
    /// Publish an empty snapshot
    ClearSnapshot,
}

/// Published set of assets
#[derive(Debug, Default)]
struct Snapshot {
    /// Assets in registration order of their sources
    assets: Vec<Asset>,
    /// When the snapshot was published by a successful pull
    pulled_at: Option<DateTime<Utc>>,
}

/// Source adapter with its registered name
struct RegisteredSource {
    name: String,
    source: Arc<dyn InventorySource>,
}

/// Builder for `InventoryManager`
#[derive(Default)]
pub struct InventoryManagerBuilder {
    sources: Vec<(String, Arc<dyn InventorySource>)>,
    failure_policy: PullFailurePolicy,
}

impl InventoryManagerBuilder {
    /// Register a source adapter
    ///
    /// Registration order determines snapshot order for `Selector::All`.
    #[must_use]
    pub fn source(mut self, name: impl Into<String>, source: Arc<dyn InventorySource>) -> Self {
        self.sources.push((name.into(), source));
        self
    }

    /// Register several source adapters in order
    #[must_use]
    pub fn sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = (String, Arc<dyn InventorySource>)>,
    {
        self.sources.extend(sources);
        self
    }

    /// Set pull failure policy
    #[must_use]
    pub fn failure_policy(mut self, policy: PullFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Build the manager
    ///
    /// # Errors
    /// Returns an error if a name is registered twice or collides with the
    /// `"all"` selector or the `"total"` stats key.
    pub fn build(self) -> Result<InventoryManager, CoreError> {
        let mut registry: Vec<RegisteredSource> = Vec::with_capacity(self.sources.len());

        for (name, source) in self.sources {
            if name == ALL_SOURCES || name == TOTAL_KEY {
                return Err(CoreError::ReservedSourceName(name));
            }
            if registry.iter().any(|r| r.name == name) {
                return Err(CoreError::DuplicateSource(name));
            }
            registry.push(RegisteredSource { name, source });
        }

        Ok(InventoryManager {
            sources: registry,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            failure_policy: self.failure_policy,
        })
    }
}

/// Aggregates assets from registered sources and answers queries
pub struct InventoryManager {
    /// Registered sources in registration order
    sources: Vec<RegisteredSource>,
    /// Current snapshot
    snapshot: RwLock<Arc<Snapshot>>,
    /// Behaviour on failed pulls
    failure_policy: PullFailurePolicy,
}

impl InventoryManager {
    /// Start building a manager
    #[must_use]
    pub fn builder() -> InventoryManagerBuilder {
        InventoryManagerBuilder::default()
    }

    /// Registered source names in registration order
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|r| r.name.as_str())
    }

    /// Check if a source is registered
    #[must_use]
    pub fn has_source(&self, name: &str) -> bool {
        self.sources.iter().any(|r| r.name == name)
    }

    #[must_use]
    pub fn failure_policy(&self) -> PullFailurePolicy {
        self.failure_policy
    }

    /// Replace the snapshot with fresh data
    ///
    /// For `Selector::All` every source is fetched concurrently and the
    /// results are concatenated in registration order. The new snapshot is
    /// published only if every fetch succeeds.
    ///
    /// # Errors
    /// Returns `UnknownSource` before any I/O if the selector names an
    /// unregistered source, or the error of the first failing source in
    /// registration order.
    #[instrument(skip(self, selector), fields(selector = %selector))]
    pub async fn pull(&self, selector: &Selector) -> Result<(), CoreError> {
        let targets: Vec<&RegisteredSource> = match selector {
            Selector::All => self.sources.iter().collect(),
            Selector::Source(name) => match self.sources.iter().find(|r| &r.name == name) {
                Some(entry) => vec![entry],
                None => {
                    self.discard_after_failure().await;
                    return Err(CoreError::UnknownSource(name.clone()));
                }
            },
        };

        info!(sources = targets.len(), "pulling inventory");

        let results = join_all(targets.into_iter().map(Self::fetch_from)).await;

        let mut assets = Vec::new();
        for result in results {
            match result {
                Ok(batch) => assets.extend(batch),
                Err(e) => {
                    self.discard_after_failure().await;
                    return Err(e);
                }
            }
        }

        let count = assets.len();
        self.publish(Snapshot {
            assets,
            pulled_at: Some(Utc::now()),
        })
        .await;

        info!(assets = count, "inventory pull completed");

        Ok(())
    }

    /// Fetch one source and check provenance of what it returned
    async fn fetch_from(entry: &RegisteredSource) -> Result<Vec<Asset>, CoreError> {
        debug!(source = %entry.name, kind = entry.source.kind(), "fetching assets");

        let assets = entry.source.fetch_assets().await.map_err(|error| {
            warn!(source = %entry.name, error = %error, "source fetch failed");
            CoreError::Fetch {
                name: entry.name.clone(),
                error,
            }
        })?;

        if let Some(stray) = assets.iter().find(|a| a.source() != entry.name) {
            warn!(
                source = %entry.name,
                found = %stray.source(),
                asset_id = %stray.asset_id(),
                "source returned misattributed asset"
            );
            return Err(CoreError::SourceMismatch {
                name: entry.name.clone(),
                found: stray.source().to_string(),
            });
        }

        debug!(source = %entry.name, count = assets.len(), "fetched assets");

        Ok(assets)
    }

    async fn publish(&self, snapshot: Snapshot) {
        let mut current = self.snapshot.write().await;
        *current = Arc::new(snapshot);
    }

    async fn discard_after_failure(&self) {
        match self.failure_policy {
            PullFailurePolicy::RestorePrevious => {
                debug!("pull failed, keeping previous snapshot");
            }
            PullFailurePolicy::ClearSnapshot => {
                debug!("pull failed, clearing snapshot");
                self.publish(Snapshot::default()).await;
            }
        }
    }

    async fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// List assets for a selector in snapshot order
    ///
    /// An unregistered source name yields an empty list.
    pub async fn list_assets(&self, selector: &Selector) -> Vec<Asset> {
        let snapshot = self.current().await;
        snapshot
            .assets
            .iter()
            .filter(|a| selector.includes(a))
            .cloned()
            .collect()
    }

    /// Keyword search within a selector, snapshot order preserved
    pub async fn search(&self, query: &str, selector: &Selector) -> Vec<Asset> {
        let snapshot = self.current().await;
        snapshot
            .assets
            .iter()
            .filter(|a| selector.includes(a) && a.matches(query))
            .cloned()
            .collect()
    }

    /// Asset counts: `"total"` plus one entry per source present
    pub async fn stats(&self) -> InventoryStats {
        InventoryStats::from_assets(&self.current().await.assets)
    }

    /// When the current snapshot was published, `None` before the first pull
    pub async fn pulled_at(&self) -> Option<DateTime<Utc>> {
        self.current().await.pulled_at
    }

    /// Number of assets in the snapshot
    pub async fn len(&self) -> usize {
        self.current().await.assets.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FetchError;
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl InventorySource for EmptySource {
        fn kind(&self) -> &'static str {
            "empty"
        }

        async fn fetch_assets(&self) -> Result<Vec<Asset>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let result = InventoryManager::builder()
            .source("netbox", Arc::new(EmptySource))
            .source("netbox", Arc::new(EmptySource))
            .build();
        assert!(matches!(result, Err(CoreError::DuplicateSource(name)) if name == "netbox"));
    }

    #[test]
    fn test_builder_rejects_reserved_names() {
        for reserved in ["all", "total"] {
            let result = InventoryManager::builder()
                .source(reserved, Arc::new(EmptySource))
                .build();
            assert!(matches!(result, Err(CoreError::ReservedSourceName(_))));
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let manager = InventoryManager::builder()
            .source("qualys", Arc::new(EmptySource))
            .source("netbox", Arc::new(EmptySource))
            .build()
            .unwrap();
        let names: Vec<&str> = manager.source_names().collect();
        assert_eq!(names, vec!["qualys", "netbox"]);
        assert!(manager.has_source("netbox"));
        assert!(!manager.has_source("ghost"));
        assert_eq!(manager.failure_policy(), PullFailurePolicy::RestorePrevious);
    }

    #[tokio::test]
    async fn test_new_manager_is_empty() {
        let manager = InventoryManager::builder().build().unwrap();
        assert!(manager.is_empty().await);
        assert!(manager.pulled_at().await.is_none());
        assert_eq!(manager.stats().await.total(), 0);
    }

    #[tokio::test]
    async fn test_pull_all_without_sources_publishes_empty_snapshot() {
        let manager = InventoryManager::builder().build().unwrap();
        manager.pull(&Selector::All).await.unwrap();
        assert!(manager.is_empty().await);
        assert!(manager.pulled_at().await.is_some());
    }
}
