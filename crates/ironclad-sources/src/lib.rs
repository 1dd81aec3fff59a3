//! ironclad-sources: backend adapters for the inventory manager
//!
//! Each adapter fetches from one backend (NetBox, Qualys, CrowdStrike)
//! and maps its payloads onto [`ironclad_core::Asset`].

pub mod config;
pub mod crowdstrike;
pub mod error;
mod extract;
pub mod factory;
pub mod http;
pub mod netbox;
pub mod qualys;

pub use config::{SourceConfig, SourceKind};
pub use crowdstrike::CrowdstrikeSource;
pub use error::{Result, SourceError};
pub use factory::{RegisteredSource, build_registry, build_source};
pub use http::HttpSource;
pub use netbox::NetboxSource;
pub use qualys::QualysSource;
