//! Source adapter trait

use async_trait::async_trait;

use crate::types::Asset;

/// Adapter-defined fetch failure
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// A backend that supplies normalized assets
///
/// Implementations are registered with the manager under a unique name and
/// must stamp that name as the `source` of every asset they return.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Backend type (`netbox`, `qualys`, ...)
    fn kind(&self) -> &'static str;

    /// Fetch the current assets from the backend
    async fn fetch_assets(&self) -> Result<Vec<Asset>, FetchError>;
}
