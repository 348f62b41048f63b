use super::{Probe, Requirement};
use crate::config::DetectorConfig;
use crate::registry::{self, HostsFiles};
use crate::types::{DetectionMethod, Evidence};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Scans the hosts file for entries overriding ad domains
pub struct HostsFileProbe {
    paths: Vec<PathBuf>,
    patterns: Vec<String>,
}

impl Default for HostsFileProbe {
    fn default() -> Self {
        Self::new(
            HostsFiles::PATHS.iter().map(PathBuf::from).collect(),
            registry::owned(HostsFiles::PATTERNS),
        )
    }
}

impl HostsFileProbe {
    pub fn new(paths: Vec<PathBuf>, patterns: Vec<String>) -> Self {
        Self { paths, patterns }
    }

    /// The first candidate that can be opened. Other candidates are never merged in.
    async fn open_first_readable(&self) -> Option<(&PathBuf, File)> {
        for path in &self.paths {
            match File::open(path).await {
                Ok(file) => return Some((path, file)),
                Err(e) => debug!("Hosts file {} not readable: {}", path.display(), e),
            }
        }
        None
    }
}

#[async_trait]
impl Probe for HostsFileProbe {
    fn name(&self) -> &'static str {
        "hosts-file"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::HostsFile
    }

    fn requirement(&self) -> Requirement {
        Requirement::Local
    }

    async fn run(&self, _config: &DetectorConfig) -> Result<Option<Evidence>> {
        let Some((path, file)) = self.open_first_readable().await else {
            return Ok(None);
        };

        // The reader owns the file and closes it on every return path
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            let text = String::from_utf8_lossy(&buf);
            let line = text.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if self.patterns.iter().any(|pattern| line.contains(pattern.as_str())) {
                return Ok(Some(Evidence::new(path.display().to_string(), line)));
            }
        }
    }
}
