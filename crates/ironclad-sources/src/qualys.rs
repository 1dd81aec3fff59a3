//! Qualys vulnerability scanner adapter
//!
//! Uses the QPS REST 2.0 host asset search, paging by `lastId`.

use async_trait::async_trait;
use ironclad_core::{Asset, FetchError, InventorySource};
use reqwest::header::ACCEPT;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SourceError};
use crate::extract::{non_blank_at, string_at, tag_value, value_at};
use crate::http::{HttpSource, USER_AGENT};

/// Host asset search endpoint
const SEARCH_PATH: &str = "qps/rest/2.0/search/am/hostasset";

/// Host assets requested per page
const PAGE_SIZE: usize = 100;

/// Tag prefix carrying the environment
const ENV_TAG: &str = "env:";

/// Tag prefix carrying the owner
const OWNER_TAG: &str = "owner:";

/// Qualys source adapter
pub struct QualysSource {
    name: String,
    http: HttpSource,
    username: String,
    password: String,
}

/// Paging state extracted from a `ServiceResponse`
#[derive(Debug, PartialEq)]
struct Page {
    hosts: Vec<Value>,
    last_id: Option<String>,
    has_more: bool,
}

impl Page {
    /// Host id to continue after, `None` once paging is done
    ///
    /// Paging also stops when Qualys repeats the id the page started after.
    fn next_after(&self, after_id: Option<&str>) -> Option<String> {
        match self.last_id.as_deref() {
            Some(last_id) if self.has_more && after_id != Some(last_id) => {
                Some(last_id.to_string())
            }
            _ => None,
        }
    }
}

impl QualysSource {
    /// Create an adapter registered under `name`
    pub fn new(
        name: impl Into<String>,
        http: HttpSource,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            http,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Fetch every host asset and map it to an asset
    ///
    /// # Errors
    /// Returns an error if a request fails or Qualys reports a non-success
    /// response code.
    #[instrument(skip(self), fields(source = %self.name, base_url = %self.http.base_url()))]
    pub async fn fetch(&self) -> Result<Vec<Asset>> {
        let url = self.http.url(SEARCH_PATH)?;
        let mut assets = Vec::new();
        let mut after_id: Option<String> = None;

        loop {
            let request = self
                .http
                .post(url.clone())
                .basic_auth(&self.username, Some(&self.password))
                .header(ACCEPT, "application/json")
                .header("X-Requested-With", USER_AGENT)
                .json(&search_request(after_id.as_deref()));
            let response: Value = self.http.send_json(request).await?;
            let page = parse_page(&response)?;
            let next = page.next_after(after_id.as_deref());

            debug!(hosts = page.hosts.len(), has_more = page.has_more, "received host asset page");

            for host in page.hosts {
                match host_to_asset(&self.name, host) {
                    Some(asset) => assets.push(asset),
                    None => warn!("skipping host asset without id"),
                }
            }

            match next {
                Some(last_id) => after_id = Some(last_id),
                None => break,
            }
        }

        info!(count = assets.len(), "fetched qualys host assets");

        Ok(assets)
    }
}

/// Search body for one page, optionally starting after a host id
fn search_request(after_id: Option<&str>) -> Value {
    let mut request = json!({
        "ServiceRequest": {
            "preferences": { "limitResults": PAGE_SIZE }
        }
    });

    if let Some(id) = after_id {
        request["ServiceRequest"]["filters"] = json!({
            "Criteria": [{ "field": "id", "operator": "GREATER", "value": id }]
        });
    }

    request
}

fn parse_page(response: &Value) -> Result<Page> {
    let service = response
        .get("ServiceResponse")
        .ok_or_else(|| SourceError::InvalidResponse("missing ServiceResponse".to_string()))?;

    let code = string_at(service, &["responseCode"]).unwrap_or_default();
    if code != "SUCCESS" {
        let message = string_at(service, &["responseErrorDetails", "errorMessage"])
            .unwrap_or_else(|| "no error details".to_string());
        return Err(SourceError::InvalidResponse(format!("{code}: {message}")));
    }

    let hosts = service
        .get("data")
        .and_then(Value::as_array)
        .map(|data| {
            data.iter()
                .filter_map(|entry| entry.get("HostAsset").cloned())
                .collect()
        })
        .unwrap_or_default();

    // hasMoreRecords arrives as "true"/"false" or as a boolean
    let has_more = match service.get("hasMoreRecords") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };

    Ok(Page {
        hosts,
        last_id: string_at(service, &["lastId"]),
        has_more,
    })
}

/// Map one Qualys `HostAsset` object to an asset
///
/// Returns `None` when the host carries no `id`.
#[must_use]
pub fn host_to_asset(source: &str, host: Value) -> Option<Asset> {
    let asset_id = string_at(&host, &["id"])?;

    let hostname = non_blank_at(&host, &["dnsHostName"])
        .or_else(|| string_at(&host, &["name"]))
        .unwrap_or_default();

    let tags: Vec<String> = value_at(&host, &["tags", "list"])
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|t| string_at(t, &["TagSimple", "name"]))
                .collect()
        })
        .unwrap_or_default();
    let tag_names = || tags.iter().map(String::as_str);

    Some(
        Asset::new(asset_id, source)
            .with_hostname(hostname)
            .with_ip_address(string_at(&host, &["address"]))
            .with_os(string_at(&host, &["os"]))
            .with_environment(tag_value(tag_names(), ENV_TAG))
            .with_owner_context(tag_value(tag_names(), OWNER_TAG))
            .with_raw(host),
    )
}

#[async_trait]
impl InventorySource for QualysSource {
    fn kind(&self) -> &'static str {
        "qualys"
    }

    async fn fetch_assets(&self) -> std::result::Result<Vec<Asset>, FetchError> {
        Ok(self.fetch().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_mapping() {
        let host = json!({
            "id": 5521,
            "name": "db01",
            "dnsHostName": "db01.corp.example.com",
            "address": "10.0.1.20",
            "os": "Windows Server 2019 Standard",
            "tags": {"list": [
                {"TagSimple": {"id": 1, "name": "owner:dba-team"}},
                {"TagSimple": {"id": 2, "name": "env:staging"}}
            ]}
        });

        let asset = host_to_asset("vulnerability-scanner", host).unwrap();
        assert_eq!(asset.asset_id(), "5521");
        assert_eq!(asset.hostname(), "db01.corp.example.com");
        assert_eq!(asset.ip_address(), Some("10.0.1.20"));
        assert_eq!(asset.os(), Some("Windows Server 2019 Standard"));
        assert_eq!(asset.environment(), Some("staging"));
        assert_eq!(asset.owner_context(), Some("dba-team"));
    }

    #[test]
    fn test_host_mapping_falls_back_to_name() {
        let host = json!({"id": "9", "name": "legacy-box", "dnsHostName": ""});
        let asset = host_to_asset("qualys", host).unwrap();
        assert_eq!(asset.hostname(), "legacy-box");
        assert_eq!(asset.environment(), None);
        assert_eq!(asset.owner_context(), None);
    }

    #[test]
    fn test_parse_page() {
        let response = json!({
            "ServiceResponse": {
                "responseCode": "SUCCESS",
                "count": 2,
                "hasMoreRecords": "true",
                "lastId": 102,
                "data": [
                    {"HostAsset": {"id": 101}},
                    {"HostAsset": {"id": 102}}
                ]
            }
        });

        let page = parse_page(&response).unwrap();
        assert_eq!(page.hosts.len(), 2);
        assert_eq!(page.last_id.as_deref(), Some("102"));
        assert!(page.has_more);
    }

    #[test]
    fn test_parse_last_page() {
        let response = json!({
            "ServiceResponse": {"responseCode": "SUCCESS", "count": 0, "hasMoreRecords": false}
        });
        let page = parse_page(&response).unwrap();
        assert!(page.hosts.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_parse_error_response() {
        let response = json!({
            "ServiceResponse": {
                "responseCode": "UNAUTHORIZED",
                "responseErrorDetails": {"errorMessage": "Bad credentials"}
            }
        });
        let err = parse_page(&response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid response: UNAUTHORIZED: Bad credentials"
        );
        assert!(parse_page(&json!({})).is_err());
    }

    #[test]
    fn test_paging_continues_after_last_id() {
        let page = Page {
            hosts: Vec::new(),
            last_id: Some("102".to_string()),
            has_more: true,
        };
        assert_eq!(page.next_after(None).as_deref(), Some("102"));
        assert_eq!(page.next_after(Some("50")).as_deref(), Some("102"));
    }

    #[test]
    fn test_paging_stops() {
        let last = Page {
            hosts: Vec::new(),
            last_id: Some("102".to_string()),
            has_more: false,
        };
        assert_eq!(last.next_after(Some("50")), None);

        let repeated = Page {
            has_more: true,
            ..last
        };
        assert_eq!(repeated.next_after(Some("102")), None);

        let without_id = Page {
            hosts: Vec::new(),
            last_id: None,
            has_more: true,
        };
        assert_eq!(without_id.next_after(None), None);
    }

    #[test]
    fn test_search_request_paging() {
        let first = search_request(None);
        assert!(first["ServiceRequest"].get("filters").is_none());
        assert_eq!(first["ServiceRequest"]["preferences"]["limitResults"], 100);

        let next = search_request(Some("102"));
        assert_eq!(
            next["ServiceRequest"]["filters"]["Criteria"][0],
            json!({"field": "id", "operator": "GREATER", "value": "102"})
        );
    }
}
