use super::{Probe, Requirement};
use crate::config::DetectorConfig;
use crate::net;
use crate::proxy::{HttpFetcher, ProxyDescriptor, ProxyKind, ProxySource};
use crate::registry::{self, ProbeUrls};
use crate::types::{DetectionMethod, Evidence};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Detects a filtering proxy on this machine that answers ad requests with
/// an empty or almost empty body instead of the real resource.
pub struct LocalProxyProbe {
    urls: Vec<String>,
    proxies: Arc<dyn ProxySource>,
    fetcher: Arc<dyn HttpFetcher>,
}

impl LocalProxyProbe {
    pub fn new(proxies: Arc<dyn ProxySource>, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self::with_urls(registry::owned(ProbeUrls::URLS), proxies, fetcher)
    }

    pub fn with_urls(
        urls: Vec<String>,
        proxies: Arc<dyn ProxySource>,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            urls,
            proxies,
            fetcher,
        }
    }

    /// First explicit HTTP proxy listening on a local address
    async fn find_local_proxy(
        &self,
        config: &DetectorConfig,
    ) -> Result<Option<(ProxyDescriptor, SocketAddr)>> {
        let Some(reference) = self.urls.first() else {
            return Ok(None);
        };
        let reference = Url::parse(reference)?;

        for proxy in self.proxies.select(&reference) {
            if proxy.kind != ProxyKind::Http {
                continue;
            }
            match proxy.socket_addr(config.dns_timeout()).await {
                Ok(addr) if net::is_local_listen_address(addr.ip()) => {
                    return Ok(Some((proxy, addr)));
                }
                Ok(addr) => debug!("Proxy {} is not local", addr),
                Err(e) => debug!("Could not locate proxy {}: {}", proxy.host, e),
            }
        }
        Ok(None)
    }

    /// True when the resource came back successfully but almost empty
    async fn is_truncated(
        &self,
        url: &str,
        proxy: &ProxyDescriptor,
        config: &DetectorConfig,
    ) -> Result<bool> {
        let timeout = config.http_timeout();
        let fetch = self
            .fetcher
            .fetch_prefix(url, proxy, ProbeUrls::READ_LIMIT, timeout);
        let outcome = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| anyhow!("fetching {} timed out after {:?}", url, timeout))??;
        if !(200..=399).contains(&outcome.status) {
            bail!("{} answered with status {}", url, outcome.status);
        }
        Ok(outcome.body_prefix.len() < ProbeUrls::MIN_PAYLOAD)
    }
}

#[async_trait]
impl Probe for LocalProxyProbe {
    fn name(&self) -> &'static str {
        "local-proxy"
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::LocalProxy
    }

    fn requirement(&self) -> Requirement {
        Requirement::LocalProxy
    }

    async fn run(&self, config: &DetectorConfig) -> Result<Option<Evidence>> {
        let Some((proxy, addr)) = self.find_local_proxy(config).await? else {
            debug!("No local HTTP proxy configured");
            return Ok(None);
        };

        for url in &self.urls {
            match self.is_truncated(url, &proxy, config).await {
                Ok(true) => return Ok(Some(Evidence::new(url.as_str(), addr.to_string()))),
                Ok(false) => debug!("{} looks intact through {}", url, addr),
                Err(e) => debug!("Fetching {} through {} failed: {}", url, addr, e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{FetchOutcome, StaticProxySource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CannedFetcher {
        status: u16,
        body_len: usize,
        calls: AtomicUsize,
    }

    impl CannedFetcher {
        fn new(status: u16, body_len: usize) -> Arc<Self> {
            Arc::new(Self {
                status,
                body_len,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HttpFetcher for CannedFetcher {
        async fn fetch_prefix(
            &self,
            _url: &str,
            _proxy: &ProxyDescriptor,
            limit: usize,
            _timeout: Duration,
        ) -> Result<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchOutcome {
                status: self.status,
                body_prefix: vec![b'x'; self.body_len.min(limit)],
            })
        }
    }

    struct RefusingFetcher;

    #[async_trait]
    impl HttpFetcher for RefusingFetcher {
        async fn fetch_prefix(
            &self,
            _url: &str,
            _proxy: &ProxyDescriptor,
            _limit: usize,
            _timeout: Duration,
        ) -> Result<FetchOutcome> {
            Err(anyhow!("connection refused"))
        }
    }

    fn local_proxy() -> Arc<StaticProxySource> {
        Arc::new(StaticProxySource::new(vec![ProxyDescriptor::http("127.0.0.1", 8080)]))
    }

    #[tokio::test]
    async fn test_tiny_payload_matches() {
        let probe = LocalProxyProbe::new(local_proxy(), CannedFetcher::new(200, 2));
        let evidence = probe.run(&DetectorConfig::thorough()).await.unwrap();
        assert_eq!(
            evidence,
            Some(Evidence::new("http://media.admob.com/sdk-core-v40.js", "127.0.0.1:8080"))
        );
    }

    #[tokio::test]
    async fn test_full_payload_does_not_match() {
        let probe = LocalProxyProbe::new(local_proxy(), CannedFetcher::new(200, 500));
        assert_eq!(probe.run(&DetectorConfig::thorough()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_error_status_does_not_match() {
        let probe = LocalProxyProbe::new(local_proxy(), CannedFetcher::new(404, 0));
        assert_eq!(probe.run(&DetectorConfig::thorough()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redirect_with_empty_body_matches() {
        let probe = LocalProxyProbe::new(local_proxy(), CannedFetcher::new(302, 0));
        assert!(probe.run(&DetectorConfig::thorough()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_match() {
        let probe = LocalProxyProbe::new(local_proxy(), Arc::new(RefusingFetcher));
        assert_eq!(probe.run(&DetectorConfig::thorough()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remote_proxy_is_never_fetched_through() {
        let fetcher = CannedFetcher::new(200, 0);
        let proxies = Arc::new(StaticProxySource::new(vec![
            ProxyDescriptor::direct(),
            ProxyDescriptor::http("10.1.2.3", 3128),
            ProxyDescriptor::socks("127.0.0.1", 1080),
        ]));
        let probe = LocalProxyProbe::new(proxies, fetcher.clone());
        assert_eq!(probe.run(&DetectorConfig::thorough()).await.unwrap(), None);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wildcard_proxy_counts_as_local() {
        let proxies = Arc::new(StaticProxySource::new(vec![ProxyDescriptor::http(
            "0.0.0.0", 8118,
        )]));
        let probe = LocalProxyProbe::new(proxies, CannedFetcher::new(200, 3));
        let evidence = probe.run(&DetectorConfig::thorough()).await.unwrap().unwrap();
        assert_eq!(evidence.secondary, "0.0.0.0:8118");
    }

    #[tokio::test]
    async fn test_every_url_is_tried() {
        let fetcher = CannedFetcher::new(200, 100);
        let probe = LocalProxyProbe::with_urls(
            vec!["http://a.example/ad.js".into(), "http://b.example/ad.js".into()],
            local_proxy(),
            fetcher.clone(),
        );
        assert_eq!(probe.run(&DetectorConfig::thorough()).await.unwrap(), None);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
