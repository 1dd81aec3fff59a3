//! Field filters applied on top of manager queries

use std::fmt;

use crate::types::Asset;

/// Asset filter builder
///
/// Narrows a query result by field. All active filters must match; an empty
/// filter passes every asset.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    /// OS substring (case-insensitive)
    os: Option<String>,
    /// Environment substring (case-insensitive)
    environment: Option<String>,
    /// Owner substring (case-insensitive)
    owner: Option<String>,
    /// IP address substring (exact case)
    ip: Option<String>,
    /// Maximum number of results
    limit: Option<usize>,
}

impl AssetFilter {
    /// Create an empty filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by operating system
    #[must_use]
    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = non_empty(os.into()).map(|s| s.to_lowercase());
        self
    }

    /// Filter by environment
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = non_empty(environment.into()).map(|s| s.to_lowercase());
        self
    }

    /// Filter by owner
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = non_empty(owner.into()).map(|s| s.to_lowercase());
        self
    }

    /// Filter by IP address
    ///
    /// Unlike the other field filters an empty needle stays active: it keeps
    /// every asset that has an IP address.
    #[must_use]
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Limit results
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Check a single asset against the field filters
    ///
    /// The limit does not take part here.
    #[must_use]
    pub fn matches(&self, asset: &Asset) -> bool {
        contains_folded(asset.os(), self.os.as_deref())
            && contains_folded(asset.environment(), self.environment.as_deref())
            && contains_folded(asset.owner_context(), self.owner.as_deref())
            && contains_exact(asset.ip_address(), self.ip.as_deref())
    }

    /// Apply the filter, keeping input order
    #[must_use]
    pub fn apply(&self, assets: Vec<Asset>) -> Vec<Asset> {
        let matched = assets.into_iter().filter(|a| self.matches(a));
        match self.limit {
            Some(n) => matched.take(n).collect(),
            None => matched.collect(),
        }
    }

    /// Whether no filter or limit is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.os.is_none()
            && self.environment.is_none()
            && self.owner.is_none()
            && self.ip.is_none()
            && self.limit.is_none()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

// Absent and blank fields never satisfy an active filter
fn contains_folded(field: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => field.is_some_and(|f| !f.is_empty() && f.to_lowercase().contains(needle)),
    }
}

fn contains_exact(field: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => field.is_some_and(|f| !f.is_empty() && f.contains(needle)),
    }
}

impl fmt::Display for AssetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref os) = self.os {
            parts.push(format!("os~{os}"));
        }
        if let Some(ref env) = self.environment {
            parts.push(format!("env~{env}"));
        }
        if let Some(ref owner) = self.owner {
            parts.push(format!("owner~{owner}"));
        }
        if let Some(ref ip) = self.ip {
            parts.push(format!("ip~{ip}"));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        if parts.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> Vec<Asset> {
        vec![
            Asset::new("1", "netbox")
                .with_hostname("web01")
                .with_ip_address(Some("10.0.0.5".to_string()))
                .with_os(Some("Ubuntu 22.04".to_string()))
                .with_environment(Some("Production".to_string()))
                .with_owner_context(Some("platform-team".to_string())),
            Asset::new("2", "qualys")
                .with_hostname("db01")
                .with_ip_address(Some("10.0.0.50".to_string()))
                .with_os(Some("Windows Server 2019".to_string()))
                .with_environment(Some("staging".to_string())),
            Asset::new("3", "crowdstrike")
                .with_hostname("laptop-7")
                .with_os(Some(String::new())),
        ]
    }

    fn ids(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(Asset::asset_id).collect()
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let filter = AssetFilter::new();
        assert!(filter.is_empty());
        assert_eq!(ids(&filter.apply(fleet())), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_os_filter_is_case_insensitive() {
        let filtered = AssetFilter::new().os("UBUNTU").apply(fleet());
        assert_eq!(ids(&filtered), vec!["1"]);
    }

    #[test]
    fn test_absent_or_blank_field_never_matches() {
        // Asset 3 has a blank os, asset 2 has no owner
        let filtered = AssetFilter::new().os("").apply(fleet());
        assert_eq!(filtered.len(), 3, "empty needle disables the filter");

        let filtered = AssetFilter::new().owner("team").apply(fleet());
        assert_eq!(ids(&filtered), vec!["1"]);
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filtered = AssetFilter::new()
            .environment("prod")
            .owner("platform")
            .apply(fleet());
        assert_eq!(ids(&filtered), vec!["1"]);

        let filtered = AssetFilter::new()
            .environment("staging")
            .owner("platform")
            .apply(fleet());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_ip_filter_is_substring() {
        let filtered = AssetFilter::new().ip("10.0.0.5").apply(fleet());
        assert_eq!(ids(&filtered), vec!["1", "2"]);
    }

    #[test]
    fn test_empty_ip_filter_drops_assets_without_ip() {
        let mut assets = fleet();
        assets.push(
            Asset::new("4", "netbox")
                .with_hostname("pdu-a")
                .with_ip_address(Some(String::new())),
        );

        let filter = AssetFilter::new().ip("");
        assert!(!filter.is_empty());
        assert_eq!(ids(&filter.apply(assets)), vec!["1", "2"]);
    }

    #[test]
    fn test_limit_keeps_first_matches() {
        let filtered = AssetFilter::new().limit(2).apply(fleet());
        assert_eq!(ids(&filtered), vec!["1", "2"]);

        let filtered = AssetFilter::new().limit(0).apply(fleet());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(AssetFilter::new().to_string(), "*");
        assert_eq!(
            AssetFilter::new().os("Linux").limit(5).to_string(),
            "os~linux limit=5"
        );
    }
}
