//! HTTP plumbing shared by the source adapters

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{Result, SourceError};

/// User agent sent with every backend request
pub const USER_AGENT: &str = concat!("ironclad-inventory/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one backend base URL
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// Create a client for a backend
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url.as_ref())?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Build a full URL from a path relative to the base URL
    ///
    /// # Errors
    /// Returns an error if the path cannot be joined onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(SourceError::Url)
    }

    /// Base URL, always ending in `/`
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a GET request
    #[must_use]
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request
    #[must_use]
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and deserialize the JSON response
    ///
    /// # Errors
    /// Returns `Auth` for 401/403, `Api` for any other non-success status,
    /// or an error if the request or deserialization fails.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        debug!(status = status.as_u16(), url = %response.url(), "backend responded");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("{status}: {message}")));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Parse a base URL so relative joins keep its path (`/netbox` -> `/netbox/`)
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
