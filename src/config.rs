use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Allow DNS and HTTP traffic. Off by default to spare battery and data.
    pub allow_networking: bool,
    /// Look for a local filtering proxy. Needs `allow_networking`.
    pub detect_local_proxy: bool,
    pub dns_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub connectivity_timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            allow_networking: false,
            detect_local_proxy: false,
            dns_timeout_secs: 3,
            http_timeout_secs: 5,
            connectivity_timeout_secs: 6,
        }
    }
}

impl DetectorConfig {
    /// Local checks only (installed apps and hosts file)
    pub fn offline() -> Self {
        Self::default()
    }

    /// Local checks plus DNS resolution of known ad servers
    pub fn networked() -> Self {
        Self {
            allow_networking: true,
            ..Self::default()
        }
    }

    /// Every probe, including the local proxy check
    pub fn thorough() -> Self {
        Self {
            allow_networking: true,
            detect_local_proxy: true,
            ..Self::default()
        }
    }

    /// The proxy flag is a sub-flag of `allow_networking`
    pub fn local_proxy_enabled(&self) -> bool {
        self.allow_networking && self.detect_local_proxy
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid detector configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_offline() {
        let config = DetectorConfig::default();
        assert!(!config.allow_networking);
        assert!(!config.detect_local_proxy);
        assert_eq!(config, DetectorConfig::offline());
    }

    #[test]
    fn test_proxy_flag_requires_networking() {
        let config = DetectorConfig {
            detect_local_proxy: true,
            ..DetectorConfig::default()
        };
        assert!(!config.local_proxy_enabled());
        assert!(DetectorConfig::thorough().local_proxy_enabled());
        assert!(!DetectorConfig::networked().local_proxy_enabled());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DetectorConfig::from_json(r#"{"allow_networking": true}"#).unwrap();
        assert!(config.allow_networking);
        assert!(!config.detect_local_proxy);
        assert_eq!(config.dns_timeout(), Duration::from_secs(3));
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(DetectorConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.json");
        std::fs::write(&path, r#"{"allow_networking": true, "detect_local_proxy": true}"#)
            .unwrap();
        let config = DetectorConfig::load(&path).unwrap();
        assert_eq!(config, DetectorConfig::thorough());
    }
}
