//! CrowdStrike Falcon endpoint security adapter
//!
//! Authenticates with OAuth2 client credentials, lists device IDs with
//! offset paging and resolves them to device details in batches.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use ironclad_core::{Asset, FetchError, InventorySource};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;
use url::form_urlencoded;

use crate::error::{Result, SourceError};
use crate::extract::{non_blank_at, string_at, tag_value};
use crate::http::HttpSource;

/// OAuth2 token endpoint
const TOKEN_PATH: &str = "oauth2/token";

/// Device ID query endpoint
const QUERY_PATH: &str = "devices/queries/devices/v1";

/// Device detail endpoint
const DETAILS_PATH: &str = "devices/entities/devices/v2";

/// Device IDs requested per query page
const QUERY_PAGE_SIZE: usize = 500;

/// Device IDs resolved per detail request
const DETAILS_BATCH_SIZE: usize = 100;

/// Tokens are renewed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Grouping tag prefix carrying the environment
const ENV_TAG: &str = "FalconGroupingTags/env-";

/// Cached bearer token
#[derive(Debug, Clone)]
struct CachedToken {
    /// Access token
    value: String,
    /// When issued
    issued_at: Instant,
    /// Usable lifetime
    ttl: Duration,
}

impl CachedToken {
    /// Check if token is expired
    fn is_expired(&self) -> bool {
        self.issued_at.elapsed() > self.ttl
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    1799
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    meta: Value,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    resources: Vec<Value>,
}

/// CrowdStrike source adapter
pub struct CrowdstrikeSource {
    name: String,
    http: HttpSource,
    client_id: String,
    client_secret: String,
    member_cid: Option<String>,
    token: RwLock<Option<CachedToken>>,
}

impl CrowdstrikeSource {
    /// Create an adapter registered under `name`
    pub fn new(
        name: impl Into<String>,
        http: HttpSource,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            member_cid: None,
            token: RwLock::new(None),
        }
    }

    /// Scope requests to a child CID
    #[must_use]
    pub fn with_member_cid(mut self, member_cid: Option<String>) -> Self {
        self.member_cid = member_cid;
        self
    }

    /// Current bearer token, requesting a new one when missing or expired
    async fn access_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(cached) = token.as_ref()
                && !cached.is_expired()
            {
                return Ok(cached.value.clone());
            }
        }

        debug!("requesting oauth2 token");

        let request = self
            .http
            .post(self.http.url(TOKEN_PATH)?)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(self.token_form());
        let response: TokenResponse = self.http.send_json(request).await?;

        if response.access_token.is_empty() {
            return Err(SourceError::Auth("empty access token".to_string()));
        }

        let ttl = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        let cached = CachedToken {
            value: response.access_token,
            issued_at: Instant::now(),
            ttl,
        };
        let value = cached.value.clone();

        *self.token.write().await = Some(cached);

        Ok(value)
    }

    fn token_form(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("client_id", &self.client_id);
        form.append_pair("client_secret", &self.client_secret);
        if let Some(ref cid) = self.member_cid {
            form.append_pair("member_cid", cid);
        }
        form.finish()
    }

    fn query_url(&self, offset: usize) -> Result<Url> {
        let mut url = self.http.url(QUERY_PATH)?;
        url.query_pairs_mut()
            .append_pair("limit", &QUERY_PAGE_SIZE.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    fn details_url(&self, ids: &[String]) -> Result<Url> {
        let mut url = self.http.url(DETAILS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            for id in ids {
                query.append_pair("ids", id);
            }
        }
        Ok(url)
    }

    /// List every device ID
    async fn device_ids(&self, token: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        loop {
            let request = self
                .http
                .get(self.query_url(ids.len())?)
                .bearer_auth(token)
                .header(ACCEPT, "application/json");
            let page: QueryResponse = self.http.send_json(request).await?;

            let received = page.resources.len();
            ids.extend(page.resources);

            debug!(received, collected = ids.len(), "received device id page");

            if ids_exhausted(received, ids.len(), &page.meta) {
                break;
            }
        }

        Ok(ids)
    }

    /// Fetch every device and map it to an asset
    ///
    /// # Errors
    /// Returns an error if authentication, the ID query or a detail request fails.
    #[instrument(skip(self), fields(source = %self.name, base_url = %self.http.base_url()))]
    pub async fn fetch(&self) -> Result<Vec<Asset>> {
        let token = self.access_token().await?;
        let ids = self.device_ids(&token).await?;

        let mut assets = Vec::with_capacity(ids.len());

        for batch in ids.chunks(DETAILS_BATCH_SIZE) {
            let request = self
                .http
                .get(self.details_url(batch)?)
                .bearer_auth(&token)
                .header(ACCEPT, "application/json");
            let details: DetailsResponse = self.http.send_json(request).await?;

            for device in details.resources {
                match device_to_asset(&self.name, device) {
                    Some(asset) => assets.push(asset),
                    None => warn!("skipping device without device_id"),
                }
            }
        }

        info!(count = assets.len(), "fetched crowdstrike devices");

        Ok(assets)
    }
}

/// Whether the ID query is done after a page of `received` IDs
///
/// Stops on an empty page or once `collected` reaches
/// `meta.pagination.total`; a response without a total is treated as the
/// last page.
fn ids_exhausted(received: usize, collected: usize, meta: &Value) -> bool {
    let total = meta
        .pointer("/pagination/total")
        .and_then(Value::as_u64)
        .and_then(|t| usize::try_from(t).ok())
        .unwrap_or(collected);

    received == 0 || collected >= total
}

/// Map one Falcon device resource to an asset
///
/// Returns `None` when the resource carries no `device_id`.
#[must_use]
pub fn device_to_asset(source: &str, device: Value) -> Option<Asset> {
    let asset_id = string_at(&device, &["device_id"])?;

    let tags: Vec<&str> = device
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let environment =
        tag_value(tags.iter().copied(), ENV_TAG).or_else(|| non_blank_at(&device, &["site_name"]));

    let owner = device
        .get("ou")
        .and_then(Value::as_array)
        .map(|ou| ou.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("/"))
        .filter(|ou| !ou.is_empty());

    let asset = Asset::new(asset_id, source)
        .with_hostname(string_at(&device, &["hostname"]).unwrap_or_default())
        .with_ip_address(string_at(&device, &["local_ip"]))
        .with_os(non_blank_at(&device, &["os_version"]).or_else(|| string_at(&device, &["platform_name"])))
        .with_environment(environment)
        .with_owner_context(owner);

    Some(asset.with_raw(device))
}

#[async_trait]
impl InventorySource for CrowdstrikeSource {
    fn kind(&self) -> &'static str {
        "crowdstrike"
    }

    async fn fetch_assets(&self) -> std::result::Result<Vec<Asset>, FetchError> {
        Ok(self.fetch().await?)
    }
}
