//! DNS resolution and address classification.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// True for loopback, link-local and unspecified addresses, the answers a
/// sinkholing DNS gives for blocked hosts.
pub fn is_sinkhole_address(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

/// True for addresses a proxy running on this machine listens on
pub fn is_local_listen_address(ip: IpAddr) -> bool {
    let ip = ip.to_canonical();
    ip.is_loopback() || ip.is_unspecified()
}

/// Forward DNS lookup
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>>;
}

/// Resolver built from the system configuration (resolv.conf and hosts file)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                debug!("System DNS configuration unavailable ({}), using getaddrinfo", e);
                return GaiResolver.resolve(host).await;
            }
        };
        let response = resolver.lookup_ip(host).await?;
        Ok(response.iter().collect())
    }
}

/// Resolver going through the platform `getaddrinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct GaiResolver;

#[async_trait]
impl HostResolver for GaiResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolve with an upper bound on the wait
pub async fn resolve_within(
    resolver: &dyn HostResolver,
    host: &str,
    timeout: Duration,
) -> Result<Vec<IpAddr>> {
    match tokio::time::timeout(timeout, resolver.resolve(host)).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("DNS lookup for {} timed out after {:?}", host, timeout)),
    }
}
