//! NetBox network registry adapter
//!
//! Reads devices from the DCIM API, following NetBox's `next` links until
//! every page has been consumed.

use async_trait::async_trait;
use ironclad_core::{Asset, FetchError, InventorySource};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::Result;
use crate::extract::{non_blank_at, string_at, strip_prefix_len};
use crate::http::HttpSource;

/// Device list endpoint
const DEVICES_PATH: &str = "api/dcim/devices/";

/// Devices requested per page
const PAGE_SIZE: usize = 1000;

/// One page of the device list
#[derive(Debug, Deserialize)]
struct DevicePage {
    #[serde(default)]
    results: Vec<Value>,
    next: Option<String>,
}

/// NetBox source adapter
pub struct NetboxSource {
    name: String,
    http: HttpSource,
    token: String,
}

impl NetboxSource {
    /// Create an adapter registered under `name`
    pub fn new(name: impl Into<String>, http: HttpSource, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            http,
            token: token.into(),
        }
    }

    /// First page URL
    fn devices_url(&self) -> Result<Url> {
        let mut url = self.http.url(DEVICES_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit", &PAGE_SIZE.to_string());
        Ok(url)
    }

    /// Fetch every device and map it to an asset
    ///
    /// # Errors
    /// Returns an error if any page request fails or cannot be parsed.
    #[instrument(skip(self), fields(source = %self.name, base_url = %self.http.base_url()))]
    pub async fn fetch(&self) -> Result<Vec<Asset>> {
        let mut assets = Vec::new();
        let mut next = Some(self.devices_url()?);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let request = self
                .http
                .get(url.clone())
                .header(AUTHORIZATION, format!("Token {}", self.token))
                .header(ACCEPT, "application/json");
            let page: DevicePage = self.http.send_json(request).await?;
            pages += 1;

            debug!(page = pages, devices = page.results.len(), "received device page");

            for device in page.results {
                match device_to_asset(&self.name, device) {
                    Some(asset) => assets.push(asset),
                    None => warn!("skipping device without id"),
                }
            }

            next = next_page(&url, page.next.as_deref())?;
        }

        info!(count = assets.len(), pages, "fetched netbox devices");

        Ok(assets)
    }
}

/// Page to request after `current`
///
/// Stops when NetBox reports no `next` link or links back to `current`.
fn next_page(current: &Url, next: Option<&str>) -> Result<Option<Url>> {
    let Some(link) = next else {
        return Ok(None);
    };

    let link = Url::parse(link)?;
    if &link == current { Ok(None) } else { Ok(Some(link)) }
}

/// Map one NetBox device object to an asset
///
/// Returns `None` when the device carries no `id`.
#[must_use]
pub fn device_to_asset(source: &str, device: Value) -> Option<Asset> {
    let asset_id = string_at(&device, &["id"])?;

    let environment = non_blank_at(&device, &["custom_fields", "environment"])
        .or_else(|| string_at(&device, &["status", "value"]));

    Some(
        Asset::new(asset_id, source)
            .with_hostname(string_at(&device, &["name"]).unwrap_or_default())
            .with_ip_address(
                string_at(&device, &["primary_ip", "address"]).map(|a| strip_prefix_len(&a)),
            )
            .with_os(string_at(&device, &["platform", "name"]))
            .with_environment(environment)
            .with_owner_context(string_at(&device, &["tenant", "name"]))
            .with_raw(device),
    )
}

#[async_trait]
impl InventorySource for NetboxSource {
    fn kind(&self) -> &'static str {
        "netbox"
    }

    async fn fetch_assets(&self) -> std::result::Result<Vec<Asset>, FetchError> {
        Ok(self.fetch().await?)
    }
}
