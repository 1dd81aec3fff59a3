//! ironclad-core: normalized asset model and aggregation engine
//!
//! Defines the `Asset` record, the `InventorySource` adapter trait and the
//! `InventoryManager` that pulls from registered sources into one snapshot
//! and answers list, search and stats queries over it.

pub mod error;
pub mod manager;
pub mod query;
pub mod source;
pub mod stats;
pub mod types;

pub use error::CoreError;
pub use manager::{InventoryManager, InventoryManagerBuilder, PullFailurePolicy};
pub use query::AssetFilter;
pub use source::{FetchError, InventorySource};
pub use stats::{InventoryStats, TOTAL_KEY};
pub use types::{ALL_SOURCES, Asset, Selector};
