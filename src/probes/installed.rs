use super::{Probe, Requirement};
use crate::config::DetectorConfig;
use crate::inventory::PackageInventory;
use crate::registry::{self, KnownBlockers};
use crate::types::{DetectionMethod, Evidence};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Looks for a known ad blocker among the installed packages
pub struct InstalledSoftwareProbe {
    packages: Vec<String>,
    inventory: Option<Arc<dyn PackageInventory>>,
}

impl InstalledSoftwareProbe {
    /// `None` means the host inventory cannot be queried; the probe never matches.
    pub fn new(inventory: Option<Arc<dyn PackageInventory>>) -> Self {
        Self::with_packages(registry::owned(KnownBlockers::PACKAGES), inventory)
    }

    pub fn with_packages(
        packages: Vec<String>,
        inventory: Option<Arc<dyn PackageInventory>>,
    ) -> Self {
        Self {
            packages,
            inventory,
        }
    }
}

#[async_trait]
impl Probe for InstalledSoftwareProbe {
    fn name(&self) -> &'static str {
        "installed-software"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::AppName
    }

    fn requirement(&self) -> Requirement {
        Requirement::Local
    }

    async fn run(&self, _config: &DetectorConfig) -> Result<Option<Evidence>> {
        let Some(inventory) = &self.inventory else {
            debug!("No package inventory available, skipping installed software check");
            return Ok(None);
        };

        for package in &self.packages {
            match inventory.is_installed(package) {
                Ok(true) => return Ok(Some(Evidence::primary(package.as_str()))),
                Ok(false) => {}
                Err(e) => debug!("Package lookup for {} failed: {}", package, e),
            }
        }
        Ok(None)
    }
}
