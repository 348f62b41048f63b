use crate::config::DetectorConfig;
use crate::dispatch::{DetectionCallback, Dispatcher};
use crate::inventory::{DataDirInventory, PackageInventory};
use crate::net::{HostResolver, SystemResolver};
use crate::probes::{
    HostsFileProbe, InstalledSoftwareProbe, LocalProxyProbe, NetworkOverrideProbe, Probe,
};
use crate::proxy::{EnvProxySource, HttpFetcher, ProxySource, ReqwestFetcher};
use crate::registry::{self, AdHosts, HostsFiles, KnownBlockers, ProbeUrls};
use crate::types::DetectionResult;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Main ad blocker detector.
///
/// Runs its probes strictly in order and stops at the first match. Probes
/// whose requirement the configuration does not permit are skipped without
/// touching the network. Cloning is cheap and clones share the probe list.
#[derive(Clone)]
pub struct AdBlockersDetector {
    config: DetectorConfig,
    probes: Arc<Vec<Box<dyn Probe>>>,
}

impl AdBlockersDetector {
    /// Create a detector with the default probes and system collaborators
    pub fn new(config: DetectorConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: DetectorConfig) -> DetectorBuilder {
        DetectorBuilder::new(config)
    }

    /// Create a detector running exactly `probes`, in the given order
    pub fn with_probes(config: DetectorConfig, probes: Vec<Box<dyn Probe>>) -> Self {
        Self {
            config,
            probes: Arc::new(probes),
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }

    /// Run the detection cascade. Never fails: probe errors and panics count
    /// as a miss for that probe.
    pub async fn detect(&self) -> DetectionResult {
        for probe in self.probes.iter() {
            if !probe.requirement().permitted_by(&self.config) {
                debug!("Probe {} not permitted by configuration", probe.name());
                continue;
            }

            match AssertUnwindSafe(probe.run(&self.config)).catch_unwind().await {
                Ok(Ok(Some(evidence))) => {
                    let result = DetectionResult::detected(probe.method(), evidence);
                    info!("Probe {} matched: {}", probe.name(), result);
                    return result;
                }
                Ok(Ok(None)) => debug!("Probe {} found nothing", probe.name()),
                Ok(Err(e)) => debug!("Probe {} failed: {:#}", probe.name(), e),
                Err(_) => warn!("Probe {} panicked", probe.name()),
            }
        }
        DetectionResult::not_found()
    }

    /// Simple check if an ad blocker is active
    pub async fn is_blocker_present(&self) -> bool {
        self.detect().await.found
    }

    /// Blocking variant of [`detect`](Self::detect), for callers without an
    /// async runtime. Runs on a private runtime, moved to a helper thread when
    /// the caller is already inside one.
    pub fn detect_blocking(&self) -> DetectionResult {
        if tokio::runtime::Handle::try_current().is_ok() {
            let detector = self.clone();
            return std::thread::spawn(move || detector.detect_on_private_runtime())
                .join()
                .unwrap_or_default();
        }
        self.detect_on_private_runtime()
    }

    fn detect_on_private_runtime(&self) -> DetectionResult {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.detect()),
            Err(e) => {
                warn!("Could not start a runtime for detection: {}", e);
                DetectionResult::not_found()
            }
        }
    }

    /// Run the cascade on the Tokio runtime and hand the result to
    /// `callback` through `dispatcher`.
    ///
    /// The callback is held weakly: if every strong reference is gone by the
    /// time the result is delivered, it is silently dropped. It is invoked at
    /// most once. Must be called from within a Tokio runtime.
    pub fn detect_async<C, D>(&self, callback: &Arc<C>, dispatcher: D) -> JoinHandle<()>
    where
        C: DetectionCallback + ?Sized + 'static,
        D: Dispatcher,
    {
        let callback: Weak<C> = Arc::downgrade(callback);
        let detector = self.clone();
        tokio::spawn(async move {
            let result = detector.detect().await;
            dispatcher.dispatch(Box::new(move || match callback.upgrade() {
                Some(callback) => callback.on_result(result),
                None => debug!("Detection callback dropped before delivery"),
            }));
        })
    }
}

/// Builder for [`AdBlockersDetector`] with the default probe order:
/// installed software, network override, hosts file, local proxy.
pub struct DetectorBuilder {
    config: DetectorConfig,
    inventory: Option<Arc<dyn PackageInventory>>,
    resolver: Arc<dyn HostResolver>,
    proxies: Arc<dyn ProxySource>,
    fetcher: Arc<dyn HttpFetcher>,
    packages: Vec<String>,
    blocked_hosts: Vec<String>,
    hosts_files: Vec<PathBuf>,
    hosts_patterns: Vec<String>,
    probe_urls: Vec<String>,
}

impl DetectorBuilder {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            inventory: DataDirInventory::android()
                .map(|inventory| Arc::new(inventory) as Arc<dyn PackageInventory>),
            resolver: Arc::new(SystemResolver),
            proxies: Arc::new(EnvProxySource::new()),
            fetcher: Arc::new(ReqwestFetcher),
            packages: registry::owned(KnownBlockers::PACKAGES),
            blocked_hosts: registry::owned(AdHosts::HOSTNAMES),
            hosts_files: HostsFiles::PATHS.iter().map(PathBuf::from).collect(),
            hosts_patterns: registry::owned(HostsFiles::PATTERNS),
            probe_urls: registry::owned(ProbeUrls::URLS),
        }
    }

    pub fn inventory(mut self, inventory: Arc<dyn PackageInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// The installed software probe will never match
    pub fn without_inventory(mut self) -> Self {
        self.inventory = None;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn proxy_source(mut self, proxies: Arc<dyn ProxySource>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn HttpFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn blocked_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn hosts_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.hosts_files = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn hosts_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn probe_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probe_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> AdBlockersDetector {
        let probes: Vec<Box<dyn Probe>> = vec![
            Box::new(InstalledSoftwareProbe::with_packages(self.packages, self.inventory)),
            Box::new(NetworkOverrideProbe::with_hosts(self.blocked_hosts, self.resolver)),
            Box::new(HostsFileProbe::new(self.hosts_files, self.hosts_patterns)),
            Box::new(LocalProxyProbe::with_urls(self.probe_urls, self.proxies, self.fetcher)),
        ];
        AdBlockersDetector::with_probes(self.config, probes)
    }
}
