//! Core error types for ironclad-core

use thiserror::Error;

use crate::source::FetchError;

/// Errors that can occur in inventory operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Selector names a source that is not registered
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// A source adapter failed to retrieve its assets
    #[error("fetch from source '{name}' failed: {error}")]
    Fetch {
        /// Registered name of the failing source
        name: String,
        /// Adapter-defined error
        #[source]
        error: FetchError,
    },

    /// A source returned an asset stamped with another source's name
    #[error("source '{name}' returned an asset attributed to '{found}'")]
    SourceMismatch {
        /// Registered name of the adapter
        name: String,
        /// Source name found on the asset
        found: String,
    },

    /// Two sources registered under the same name
    #[error("source registered twice: {0}")]
    DuplicateSource(String),

    /// Source name collides with a selector or stats keyword
    #[error("reserved source name: {0}")]
    ReservedSourceName(String),
}

impl CoreError {
    /// Check if error stems from caller input or configuration rather than a backend
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownSource(_)
                | CoreError::DuplicateSource(_)
                | CoreError::ReservedSourceName(_)
        )
    }

    /// Name of the source the error refers to
    #[must_use]
    pub fn source_name(&self) -> &str {
        match self {
            CoreError::UnknownSource(name)
            | CoreError::Fetch { name, .. }
            | CoreError::SourceMismatch { name, .. }
            | CoreError::DuplicateSource(name)
            | CoreError::ReservedSourceName(name) => name,
        }
    }
}
