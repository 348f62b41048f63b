use super::{Probe, Requirement};
use crate::config::DetectorConfig;
use crate::net::{self, HostResolver};
use crate::registry::{self, AdHosts};
use crate::types::{DetectionMethod, Evidence};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Resolves known ad servers and flags answers pointing at this machine
/// or the link. Local development DNS overrides also trip this check.
pub struct NetworkOverrideProbe {
    hosts: Vec<String>,
    resolver: Arc<dyn HostResolver>,
}

impl NetworkOverrideProbe {
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self::with_hosts(registry::owned(AdHosts::HOSTNAMES), resolver)
    }

    pub fn with_hosts(hosts: Vec<String>, resolver: Arc<dyn HostResolver>) -> Self {
        Self { hosts, resolver }
    }
}

#[async_trait]
impl Probe for NetworkOverrideProbe {
    fn name(&self) -> &'static str {
        "network-override"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::HostResolution
    }

    fn requirement(&self) -> Requirement {
        Requirement::Network
    }

    async fn run(&self, config: &DetectorConfig) -> Result<Option<Evidence>> {
        for host in &self.hosts {
            let lookup = net::resolve_within(self.resolver.as_ref(), host, config.dns_timeout());
            let addrs = match lookup.await {
                Ok(addrs) => addrs,
                Err(e) => {
                    debug!("Could not resolve {}: {}", host, e);
                    continue;
                }
            };
            if let Some(addr) = addrs.into_iter().find(|ip| net::is_sinkhole_address(*ip)) {
                return Ok(Some(Evidence::new(host.as_str(), addr.to_string())));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::net::IpAddr;

    struct MapResolver(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl HostResolver for MapResolver {
        async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
            match self.0.get(host) {
                Some(ip) => Ok(vec![ip.parse()?]),
                None => Err(anyhow!("NXDOMAIN {}", host)),
            }
        }
    }

    fn probe(entries: &[(&'static str, &'static str)]) -> NetworkOverrideProbe {
        NetworkOverrideProbe::new(Arc::new(MapResolver(entries.iter().copied().collect())))
    }

    #[tokio::test]
    async fn test_loopback_answer_matches() {
        let probe = probe(&[("a.admob.com", "127.0.0.1")]);
        let evidence = probe.run(&DetectorConfig::networked()).await.unwrap();
        assert_eq!(evidence, Some(Evidence::new("a.admob.com", "127.0.0.1")));
    }

    #[tokio::test]
    async fn test_public_answer_does_not_match() {
        let probe = probe(&[("a.admob.com", "93.184.216.34")]);
        assert_eq!(probe.run(&DetectorConfig::networked()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_iteration() {
        // Every host before this one fails to resolve
        let probe = probe(&[("aax-eu.amazon-adsystem.com", "0.0.0.0")]);
        let evidence = probe.run(&DetectorConfig::networked()).await.unwrap();
        assert_eq!(evidence, Some(Evidence::new("aax-eu.amazon-adsystem.com", "0.0.0.0")));
    }

    #[tokio::test]
    async fn test_link_local_ipv6_matches() {
        let probe = probe(&[("mm.admob.com", "fe80::1")]);
        let evidence = probe.run(&DetectorConfig::networked()).await.unwrap();
        assert_eq!(evidence, Some(Evidence::new("mm.admob.com", "fe80::1")));
    }
}
