//! Configuration types for source adapters

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Registered name used for the network registry by default
pub const NETWORK_REGISTRY: &str = "network-registry";
/// Registered name used for the vulnerability scanner by default
pub const VULNERABILITY_SCANNER: &str = "vulnerability-scanner";
/// Registered name used for the endpoint security platform by default
pub const ENDPOINT_SECURITY: &str = "endpoint-security";

/// Configuration for a single source adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Registered name, stamped on every asset this source returns
    pub name: String,
    /// Backend base URL
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Disabled sources are not registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Backend type and credentials
    #[serde(flatten)]
    pub kind: SourceKind,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

/// Backend type with its credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// NetBox network registry
    Netbox {
        /// API token
        token: String,
    },
    /// Qualys vulnerability scanner
    Qualys {
        /// API user
        username: String,
        /// API password
        password: String,
    },
    /// CrowdStrike Falcon endpoint security
    Crowdstrike {
        /// OAuth2 client ID
        client_id: String,
        /// OAuth2 client secret
        client_secret: String,
        /// Child CID for MSSP deployments
        #[serde(default)]
        member_cid: Option<String>,
    },
}

impl SourceKind {
    /// Backend type name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Netbox { .. } => "netbox",
            SourceKind::Qualys { .. } => "qualys",
            SourceKind::Crowdstrike { .. } => "crowdstrike",
        }
    }

    /// Registered name used when none is configured
    #[must_use]
    pub fn default_name(&self) -> &'static str {
        match self {
            SourceKind::Netbox { .. } => NETWORK_REGISTRY,
            SourceKind::Qualys { .. } => VULNERABILITY_SCANNER,
            SourceKind::Crowdstrike { .. } => ENDPOINT_SECURITY,
        }
    }
}

// Credentials stay out of logs
impl std::fmt::Debug for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Netbox { .. } => f
                .debug_struct("Netbox")
                .field("token", &"<redacted>")
                .finish(),
            SourceKind::Qualys { username, .. } => f
                .debug_struct("Qualys")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            SourceKind::Crowdstrike {
                client_id,
                member_cid,
                ..
            } => f
                .debug_struct("Crowdstrike")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("member_cid", member_cid)
                .finish(),
        }
    }
}

impl SourceConfig {
    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the default source set from environment-style lookups
    ///
    /// A source is included only when its URL and credentials are all present:
    /// `NETBOX_API_URL`/`NETBOX_TOKEN`, `QUALYS_API_URL`/`QUALYS_USERNAME`/
    /// `QUALYS_PASSWORD`, `CROWDSTRIKE_API_URL`/`CROWDSTRIKE_CLIENT_ID`/
    /// `CROWDSTRIKE_CLIENT_SECRET`.
    pub fn defaults_from<F>(lookup: F) -> Vec<SourceConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut sources = Vec::new();

        if let Some(url) = var("NETBOX_API_URL")
            && let Some(token) = var("NETBOX_TOKEN")
        {
            sources.push(SourceConfig::new(url, SourceKind::Netbox { token }));
        }

        if let Some(url) = var("QUALYS_API_URL")
            && let Some(username) = var("QUALYS_USERNAME")
            && let Some(password) = var("QUALYS_PASSWORD")
        {
            sources.push(SourceConfig::new(
                url,
                SourceKind::Qualys { username, password },
            ));
        }

        if let Some(url) = var("CROWDSTRIKE_API_URL")
            && let Some(client_id) = var("CROWDSTRIKE_CLIENT_ID")
            && let Some(client_secret) = var("CROWDSTRIKE_CLIENT_SECRET")
        {
            sources.push(SourceConfig::new(
                url,
                SourceKind::Crowdstrike {
                    client_id,
                    client_secret,
                    member_cid: var("CROWDSTRIKE_MEMBER_CID"),
                },
            ));
        }

        sources
    }

    /// Create an enabled source under its kind's default name
    #[must_use]
    pub fn new(url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: kind.default_name().to_string(),
            url: url.into(),
            timeout_secs: default_timeout_secs(),
            enabled: default_enabled(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Deserialize)]
    struct Sources {
        source: Vec<SourceConfig>,
    }

    #[test]
    fn test_parse_all_kinds() {
        let toml = r#"
            [[source]]
            name = "netbox"
            kind = "netbox"
            url = "https://netbox.example.com"
            token = "abc"

            [[source]]
            name = "qualys"
            kind = "qualys"
            url = "https://qualysapi.qualys.com"
            username = "scanner"
            password = "hunter2"
            timeout_secs = 90

            [[source]]
            name = "falcon"
            kind = "crowdstrike"
            url = "https://api.crowdstrike.com"
            client_id = "id"
            client_secret = "secret"
            enabled = false
        "#;

        let parsed: Sources = toml::from_str(toml).unwrap();
        assert_eq!(parsed.source.len(), 3);

        let netbox = &parsed.source[0];
        assert_eq!(netbox.name, "netbox");
        assert_eq!(netbox.timeout(), Duration::from_secs(30));
        assert!(netbox.enabled);
        assert!(matches!(netbox.kind, SourceKind::Netbox { ref token } if token == "abc"));

        let qualys = &parsed.source[1];
        assert_eq!(qualys.timeout_secs, 90);
        assert_eq!(qualys.kind.as_str(), "qualys");

        let falcon = &parsed.source[2];
        assert!(!falcon.enabled);
        assert!(matches!(
            falcon.kind,
            SourceKind::Crowdstrike { member_cid: None, .. }
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml = r#"
            [[source]]
            name = "x"
            kind = "servicenow"
            url = "https://x.example.com"
        "#;
        assert!(toml::from_str::<Sources>(toml).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let kind = SourceKind::Crowdstrike {
            client_id: "id".to_string(),
            client_secret: "s3cr3t".to_string(),
            member_cid: None,
        };
        let rendered = format!("{kind:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_defaults_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("NETBOX_API_URL", "https://netbox.example.com"),
            ("NETBOX_TOKEN", "abc"),
            ("QUALYS_API_URL", "https://qualysapi.qualys.com"),
            ("QUALYS_USERNAME", "scanner"),
            // password missing: qualys is skipped
            ("CROWDSTRIKE_API_URL", "https://api.crowdstrike.com"),
            ("CROWDSTRIKE_CLIENT_ID", "id"),
            ("CROWDSTRIKE_CLIENT_SECRET", "secret"),
            ("CROWDSTRIKE_MEMBER_CID", ""),
        ]);

        let sources = SourceConfig::defaults_from(|key| env.get(key).map(|v| (*v).to_string()));
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![NETWORK_REGISTRY, ENDPOINT_SECURITY]);
        assert!(matches!(
            sources[1].kind,
            SourceKind::Crowdstrike { member_cid: None, .. }
        ));
    }
}
