//! Configuration loading and types

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use ironclad_core::PullFailurePolicy;
use ironclad_sources::SourceConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "IRONCLAD_CONFIG";

/// Top-level configuration for the inventory CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// What a failed pull does to the published snapshot
    #[serde(default)]
    pub failure_policy: PullFailurePolicy,
    /// Source adapters, in registration order
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            failure_policy: PullFailurePolicy::default(),
            sources: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid configuration
    pub fn parse(content: &str) -> eyre::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Find the configuration file to use, if any
    ///
    /// `IRONCLAD_CONFIG` wins even when the file it names does not exist.
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let mut paths = vec![
            PathBuf::from("ironclad.toml"),
            PathBuf::from("/etc/ironclad/ironclad.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ironclad/ironclad.toml"));
        }

        paths.into_iter().find(|p| p.exists())
    }

    /// Defaults with sources taken from the process environment
    pub fn from_env() -> Self {
        Self {
            sources: SourceConfig::defaults_from(|key| std::env::var(key).ok()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironclad_sources::SourceKind;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            log_level = "debug"
            failure_policy = "clear_snapshot"

            [[source]]
            name = "network-registry"
            kind = "netbox"
            url = "https://netbox.example.com"
            token = "abc"

            [[source]]
            name = "endpoint-security"
            kind = "crowdstrike"
            url = "https://api.crowdstrike.com"
            client_id = "id"
            client_secret = "secret"
            member_cid = "child"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.failure_policy, PullFailurePolicy::ClearSnapshot);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].name, "network-registry");
        assert!(matches!(
            config.sources[1].kind,
            SourceKind::Crowdstrike { ref member_cid, .. } if member_cid.as_deref() == Some("child")
        ));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.failure_policy, PullFailurePolicy::RestorePrevious);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        assert!(Config::parse(r#"failure_policy = "ignore""#).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/ironclad.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ironclad.toml"));
    }
}
