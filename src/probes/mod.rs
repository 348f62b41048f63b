//! Independent heuristic checks. Each probe answers match or no match.

mod hosts_file;
mod installed;
mod local_proxy;
mod network_override;

pub use hosts_file::HostsFileProbe;
pub use installed::InstalledSoftwareProbe;
pub use local_proxy::LocalProxyProbe;
pub use network_override::NetworkOverrideProbe;

use crate::config::DetectorConfig;
use crate::types::{DetectionMethod, Evidence};
use anyhow::Result;
use async_trait::async_trait;

/// What a probe needs before it may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Local checks only, always allowed
    Local,
    /// Sends DNS or HTTP traffic
    Network,
    /// Network access plus the local proxy sub-flag
    LocalProxy,
}

impl Requirement {
    pub fn permitted_by(self, config: &DetectorConfig) -> bool {
        match self {
            Self::Local => true,
            Self::Network => config.allow_networking,
            Self::LocalProxy => config.local_proxy_enabled(),
        }
    }
}

/// One step of the detection cascade
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Method reported when this probe matches
    fn method(&self) -> DetectionMethod;

    fn requirement(&self) -> Requirement;

    /// `Ok(None)` is a clean miss. Errors are treated as a miss by the caller.
    async fn run(&self, config: &DetectorConfig) -> Result<Option<Evidence>>;
}
