//! Proxy configuration discovery and HTTP fetching through a proxy.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use url::{Host, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    Direct,
    Http,
    Socks,
}

/// One candidate route for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
}

impl ProxyDescriptor {
    pub fn direct() -> Self {
        Self {
            kind: ProxyKind::Direct,
            host: String::new(),
            port: 0,
        }
    }

    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: ProxyKind::Http,
            host: host.into(),
            port,
        }
    }

    pub fn socks(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: ProxyKind::Socks,
            host: host.into(),
            port,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ProxyKind::Direct
    }

    /// Proxy URL in the form reqwest expects
    pub fn proxy_url(&self) -> String {
        let scheme = match self.kind {
            ProxyKind::Socks => "socks5",
            _ => "http",
        };
        match self.host.parse::<Ipv6Addr>() {
            Ok(v6) => format!("{}://[{}]:{}", scheme, v6, self.port),
            Err(_) => format!("{}://{}:{}", scheme, self.host, self.port),
        }
    }

    /// Socket address of the proxy. Host names are looked up, bounded by `timeout`.
    pub async fn socket_addr(&self, timeout: Duration) -> Result<SocketAddr> {
        if self.is_direct() {
            bail!("direct connection has no proxy address");
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        let lookup = tokio::net::lookup_host((self.host.as_str(), self.port));
        let mut addrs = tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| anyhow!("lookup of proxy host {} timed out", self.host))??;
        addrs
            .next()
            .ok_or_else(|| anyhow!("proxy host {} has no address", self.host))
    }
}

/// Source of the active proxy configuration
pub trait ProxySource: Send + Sync {
    /// Candidate routes for `url`, in preference order
    fn select(&self, url: &Url) -> Vec<ProxyDescriptor>;
}

/// Proxy configuration from the conventional environment variables
/// (`http_proxy`, `https_proxy`, `all_proxy`, `no_proxy`, any case)
#[derive(Debug, Clone, Default)]
pub struct EnvProxySource {
    vars: Option<HashMap<String, String>>,
}

impl EnvProxySource {
    /// Reads the process environment on every selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed set of variables instead of the process environment
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        let value = match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn first_var(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.var(name))
    }

    fn bypassed(&self, host: &str) -> bool {
        let Some(no_proxy) = self.first_var(&["no_proxy", "NO_PROXY"]) else {
            return false;
        };
        let host = host.to_lowercase();
        no_proxy
            .split(',')
            .map(|entry| entry.trim().trim_start_matches('.').to_lowercase())
            .filter(|entry| !entry.is_empty())
            .any(|entry| entry == "*" || host == entry || host.ends_with(&format!(".{}", entry)))
    }
}

impl ProxySource for EnvProxySource {
    fn select(&self, url: &Url) -> Vec<ProxyDescriptor> {
        if url.host_str().is_some_and(|host| self.bypassed(host)) {
            return vec![ProxyDescriptor::direct()];
        }
        let names: &[&str] = match url.scheme() {
            "https" => &["https_proxy", "HTTPS_PROXY", "all_proxy", "ALL_PROXY"],
            _ => &["http_proxy", "HTTP_PROXY", "all_proxy", "ALL_PROXY"],
        };
        match self.first_var(names).and_then(|value| parse_proxy(&value)) {
            Some(proxy) => vec![proxy],
            None => vec![ProxyDescriptor::direct()],
        }
    }
}

/// Parse a proxy setting such as `http://127.0.0.1:8080` or `localhost:3128`
pub fn parse_proxy(value: &str) -> Option<ProxyDescriptor> {
    let value = value.trim();
    let url = if value.contains("://") {
        Url::parse(value).ok()?
    } else {
        Url::parse(&format!("http://{}", value)).ok()?
    };
    let host = match url.host()? {
        Host::Domain(domain) => domain.to_string(),
        Host::Ipv4(v4) => v4.to_string(),
        Host::Ipv6(v6) => v6.to_string(),
    };
    match url.scheme() {
        "http" | "https" => {
            let port = url.port_or_known_default()?;
            Some(ProxyDescriptor::http(host, port))
        }
        "socks4" | "socks4a" | "socks5" | "socks5h" => {
            Some(ProxyDescriptor::socks(host, url.port().unwrap_or(1080)))
        }
        _ => None,
    }
}

/// Fixed proxy list, whatever the target URL
#[derive(Debug, Clone, Default)]
pub struct StaticProxySource {
    proxies: Vec<ProxyDescriptor>,
}

impl StaticProxySource {
    pub fn new(proxies: Vec<ProxyDescriptor>) -> Self {
        Self { proxies }
    }
}

impl ProxySource for StaticProxySource {
    fn select(&self, _url: &Url) -> Vec<ProxyDescriptor> {
        self.proxies.clone()
    }
}

/// Status code and the first bytes of a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: u16,
    pub body_prefix: Vec<u8>,
}

/// HTTP GET routed through an explicit proxy
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetch `url` through `proxy`, reading at most `limit` body bytes
    async fn fetch_prefix(
        &self,
        url: &str,
        proxy: &ProxyDescriptor,
        limit: usize,
        timeout: Duration,
    ) -> Result<FetchOutcome>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestFetcher;

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch_prefix(
        &self,
        url: &str,
        proxy: &ProxyDescriptor,
        limit: usize,
        timeout: Duration,
    ) -> Result<FetchOutcome> {
        let builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout);
        let builder = match proxy.kind {
            ProxyKind::Direct => builder.no_proxy(),
            ProxyKind::Http => builder.proxy(reqwest::Proxy::all(proxy.proxy_url())?),
            ProxyKind::Socks => bail!("SOCKS proxies are not supported"),
        };
        let client = builder.build()?;

        let mut response = client.get(url).send().await?;
        let status = response.status().as_u16();

        let mut body_prefix = Vec::with_capacity(limit);
        while body_prefix.len() < limit {
            match response.chunk().await? {
                Some(chunk) => {
                    let take = (limit - body_prefix.len()).min(chunk.len());
                    body_prefix.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }

        Ok(FetchOutcome {
            status,
            body_prefix,
        })
    }
}
