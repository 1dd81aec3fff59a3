//! Source adapter factory for turning configuration into registered sources

use std::sync::Arc;

use ironclad_core::InventorySource;
use tracing::{debug, info};

use crate::config::{SourceConfig, SourceKind};
use crate::crowdstrike::CrowdstrikeSource;
use crate::error::{Result, SourceError};
use crate::http::HttpSource;
use crate::netbox::NetboxSource;
use crate::qualys::QualysSource;

/// Registered name paired with its adapter
pub type RegisteredSource = (String, Arc<dyn InventorySource>);

/// Create the adapter for a single source
///
/// # Errors
/// Returns `Config` if the name or a credential is blank, or an error if the
/// base URL is invalid.
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn InventorySource>> {
    if config.name.trim().is_empty() {
        return Err(SourceError::Config("source name must not be empty".to_string()));
    }

    let http = HttpSource::new(&config.url, config.timeout())?;
    let name = config.name.clone();

    let source: Arc<dyn InventorySource> = match &config.kind {
        SourceKind::Netbox { token } => {
            require(&name, "token", token)?;
            Arc::new(NetboxSource::new(name, http, token))
        }
        SourceKind::Qualys { username, password } => {
            require(&name, "username", username)?;
            require(&name, "password", password)?;
            Arc::new(QualysSource::new(name, http, username, password))
        }
        SourceKind::Crowdstrike {
            client_id,
            client_secret,
            member_cid,
        } => {
            require(&name, "client_id", client_id)?;
            require(&name, "client_secret", client_secret)?;
            Arc::new(
                CrowdstrikeSource::new(name, http, client_id, client_secret)
                    .with_member_cid(member_cid.clone().filter(|cid| !cid.is_empty())),
            )
        }
    };

    Ok(source)
}

fn require(name: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SourceError::Config(format!(
            "source '{name}' is missing {field}"
        )));
    }
    Ok(())
}

/// Create adapters for every enabled source, in configuration order
///
/// # Errors
/// Returns the first configuration error encountered.
pub fn build_registry(configs: &[SourceConfig]) -> Result<Vec<RegisteredSource>> {
    let mut registry = Vec::with_capacity(configs.len());

    for config in configs {
        if !config.enabled {
            debug!(source = %config.name, "skipping disabled source");
            continue;
        }

        let source = build_source(config)?;
        debug!(source = %config.name, kind = source.kind(), url = %config.url, "built source");
        registry.push((config.name.clone(), source));
    }

    info!(count = registry.len(), "source registry built");

    Ok(registry)
}
