use crate::config::DetectorConfig;
use crate::dispatch::{ConnectivityCallback, Dispatcher};
use crate::registry::{self, ConnectivityHosts};

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Checks whether the Internet is reachable by sending `HEAD /` to a few
/// well known hosts. Useful to tell "no ad blocker" apart from "offline".
#[derive(Debug, Clone)]
pub struct ConnectivityChecker {
    hosts: Arc<Vec<String>>,
    timeout: Duration,
    system_proxy: bool,
}

impl ConnectivityChecker {
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_hosts(
            registry::owned(ConnectivityHosts::HOSTS),
            config.connectivity_timeout(),
        )
    }

    /// `hosts` are `host` or `host:port` authorities, tried in order
    pub fn with_hosts(hosts: Vec<String>, timeout: Duration) -> Self {
        Self {
            hosts: Arc::new(hosts),
            timeout,
            system_proxy: true,
        }
    }

    /// Connect straight to the hosts, ignoring any configured proxy
    pub fn without_proxy(mut self) -> Self {
        self.system_proxy = false;
        self
    }

    /// True when any host answers with a 2xx or 3xx status
    pub async fn is_connected(&self) -> bool {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout);
        if !self.system_proxy {
            builder = builder.no_proxy();
        }
        let client = match builder.build() {
            Ok(client) => client,
            Err(e) => {
                debug!("Could not build HTTP client: {}", e);
                return false;
            }
        };

        for host in self.hosts.iter() {
            if Self::is_reachable(&client, host).await {
                return true;
            }
        }
        false
    }

    async fn is_reachable(client: &reqwest::Client, host: &str) -> bool {
        let url = format!("http://{}/", host);
        match client.head(&url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("{} answered {}", url, status);
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                debug!("{} unreachable: {}", url, e);
                false
            }
        }
    }

    /// Background variant of [`is_connected`](Self::is_connected), with the
    /// same delivery rules as `AdBlockersDetector::detect_async`.
    pub fn detect_async<C, D>(&self, callback: &Arc<C>, dispatcher: D) -> JoinHandle<()>
    where
        C: ConnectivityCallback + ?Sized + 'static,
        D: Dispatcher,
    {
        let callback: Weak<C> = Arc::downgrade(callback);
        let checker = self.clone();
        tokio::spawn(async move {
            let connected = checker.is_connected().await;
            dispatcher.dispatch(Box::new(move || {
                if let Some(callback) = callback.upgrade() {
                    callback.on_result(connected);
                }
            }));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_hosts_means_offline() {
        let checker = ConnectivityChecker::with_hosts(vec![], Duration::from_secs(1));
        assert!(!checker.is_connected().await);
    }

    #[tokio::test]
    async fn test_async_answer_is_delivered() {
        let checker = ConnectivityChecker::with_hosts(vec![], Duration::from_secs(1));
        let answers = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = answers.clone();
        let callback = Arc::new(move |connected: bool| sink.lock().unwrap().push(connected));

        checker
            .detect_async(&callback, crate::dispatch::WorkerDispatcher)
            .await
            .unwrap();
        assert_eq!(*answers.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let checker =
            ConnectivityChecker::with_hosts(vec![addr.to_string()], Duration::from_secs(2))
                .without_proxy();
        assert!(!checker.is_connected().await);
    }
}
