//! Installed software lookups.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

/// Answers whether a package is installed on the host
pub trait PackageInventory: Send + Sync {
    /// An error means the answer is unknown; callers treat it as absent.
    fn is_installed(&self, package: &str) -> Result<bool>;
}

/// Fixed set of installed packages
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    packages: HashSet<String>,
}

impl StaticInventory {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }
}

impl PackageInventory for StaticInventory {
    fn is_installed(&self, package: &str) -> Result<bool> {
        Ok(self.packages.contains(package))
    }
}

/// A package counts as installed when its data directory exists under `root`.
/// Android keeps one directory per app in `/data/data`.
#[derive(Debug, Clone)]
pub struct DataDirInventory {
    root: PathBuf,
}

impl DataDirInventory {
    pub const ANDROID_ROOT: &'static str = "/data/data";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The Android data directory, when this host has one
    pub fn android() -> Option<Self> {
        let root = PathBuf::from(Self::ANDROID_ROOT);
        root.is_dir().then(|| Self::new(root))
    }
}

impl PackageInventory for DataDirInventory {
    fn is_installed(&self, package: &str) -> Result<bool> {
        // Package ids never contain separators; refuse anything that could escape root
        if package.is_empty() || package.contains(['/', '\\']) || package.starts_with('.') {
            return Ok(false);
        }
        Ok(self.root.join(package).try_exists()?)
    }
}
