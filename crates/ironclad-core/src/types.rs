//! Inventory type definitions

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

/// Placeholder rendered for absent optional fields in summaries
const NOT_AVAILABLE: &str = "n/a";

/// Selector literal that addresses every registered source
pub const ALL_SOURCES: &str = "all";

// ============================================================================
// Asset
// ============================================================================

/// Normalized inventory record
///
/// One entity as reported by exactly one source. Optional fields keep
/// `None` ("unknown") distinct from `Some("")` ("explicitly blank").
///
/// The JSON form carries exactly the seven normalized fields; the raw
/// payload is kept for traceability only and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    asset_id: String,
    hostname: String,
    ip_address: Option<String>,
    os: Option<String>,
    environment: Option<String>,
    owner_context: Option<String>,
    source: String,
    #[serde(skip)]
    raw: Value,
}

impl Asset {
    /// Create an asset with its identity and provenance
    pub fn new(asset_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            hostname: String::new(),
            ip_address: None,
            os: None,
            environment: None,
            owner_context: None,
            source: source.into(),
            raw: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set hostname
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set IP address
    #[must_use]
    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    /// Set operating system
    #[must_use]
    pub fn with_os(mut self, os: Option<String>) -> Self {
        self.os = os;
        self
    }

    /// Set environment
    #[must_use]
    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    /// Set owner context
    #[must_use]
    pub fn with_owner_context(mut self, owner_context: Option<String>) -> Self {
        self.owner_context = owner_context;
        self
    }

    /// Attach the original source payload
    #[must_use]
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    #[must_use]
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    #[must_use]
    pub fn os(&self) -> Option<&str> {
        self.os.as_deref()
    }

    #[must_use]
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    #[must_use]
    pub fn owner_context(&self) -> Option<&str> {
        self.owner_context.as_deref()
    }

    /// Name of the source that produced this asset
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Original source payload
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Case-insensitive keyword match
    ///
    /// True if the query is a substring of any normalized field. Absent
    /// optional fields take part as empty strings, so an empty query
    /// matches every asset.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let fields = [
            self.asset_id.as_str(),
            self.hostname.as_str(),
            self.ip_address().unwrap_or_default(),
            self.os().unwrap_or_default(),
            self.environment().unwrap_or_default(),
            self.owner_context().unwrap_or_default(),
            self.source.as_str(),
        ];

        fields
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }

    /// One-line human readable rendering used by table output
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} ip={} os={} env={} owner={}",
            self.source,
            self.hostname,
            self.ip_address().unwrap_or(NOT_AVAILABLE),
            self.os().unwrap_or(NOT_AVAILABLE),
            self.environment().unwrap_or(NOT_AVAILABLE),
            self.owner_context().unwrap_or(NOT_AVAILABLE),
        )
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

// ============================================================================
// Selector
// ============================================================================

/// Scope of a pull or query: every source, or one source by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Selector {
    /// Every registered source
    #[default]
    All,
    /// A single source by registered name
    Source(String),
}

impl Selector {
    /// Whether an asset falls inside this selector
    #[must_use]
    pub fn includes(&self, asset: &Asset) -> bool {
        match self {
            Selector::All => true,
            Selector::Source(name) => asset.source() == name,
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        if value == ALL_SOURCES {
            Selector::All
        } else {
            Selector::Source(value.to_string())
        }
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        if value == ALL_SOURCES {
            Selector::All
        } else {
            Selector::Source(value)
        }
    }
}

impl FromStr for Selector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Selector::from(s))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str(ALL_SOURCES),
            Selector::Source(name) => f.write_str(name),
        }
    }
}
