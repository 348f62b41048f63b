use serde::{Deserialize, Serialize};
use std::fmt;

/// Which probe produced a positive result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Nothing detected
    #[default]
    None,
    /// Ad domain entry found in a hosts file
    HostsFile,
    /// Known ad blocker package installed
    AppName,
    /// Ad server resolved to a local address
    HostResolution,
    /// Local proxy truncated an ad resource
    LocalProxy,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::HostsFile => write!(f, "hosts file"),
            Self::AppName => write!(f, "installed app"),
            Self::HostResolution => write!(f, "host resolution"),
            Self::LocalProxy => write!(f, "local proxy"),
        }
    }
}

/// Evidence returned by a probe when it matches
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evidence {
    pub primary: String,
    pub secondary: String,
}

impl Evidence {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn primary(primary: impl Into<String>) -> Self {
        Self::new(primary, String::new())
    }
}

/// Result of one detection run.
///
/// The detail fields depend on `method`:
/// - `AppName`: matched package id, empty
/// - `HostResolution`: hostname, resolved address
/// - `HostsFile`: hosts file path, matching line
/// - `LocalProxy`: probe URL, proxy address
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub found: bool,
    pub method: DetectionMethod,
    pub primary_detail: String,
    pub secondary_detail: String,
}

impl DetectionResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn detected(method: DetectionMethod, evidence: Evidence) -> Self {
        Self {
            found: true,
            method,
            primary_detail: evidence.primary,
            secondary_detail: evidence.secondary,
        }
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.found {
            return write!(f, "no ad blocker detected");
        }
        write!(f, "ad blocker detected by {}: {}", self.method, self.primary_detail)?;
        if !self.secondary_detail.is_empty() {
            write!(f, " ({})", self.secondary_detail)?;
        }
        Ok(())
    }
}
