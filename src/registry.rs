//! Static reference data used by the probes.

/// Package identifiers of known ad blocking apps
pub struct KnownBlockers;

impl KnownBlockers {
    pub const PACKAGES: &'static [&'static str] = &[
        "de.ub0r.android.adBlock",
        "org.adblockplus.android",
        "com.bigtincan.android.adfree",
        "org.adaway",
        "org.czzsunset.adblock",
        "com.pasvante.adblocker",
        "com.perlapps.MyInternetSecurity",
        "net.xdevelop.adblocker_t",
        "net.xdevelop.adblocker",
        "com.jrummy.apps.ad.blocker",
        "com.atejapps.advanishlite",
        "com.atejapps.advanish",
        "pl.adblocker.free",
        "de.resolution.blockit",
    ];
}

/// Ad serving hosts that a sinkholing DNS typically rewrites
pub struct AdHosts;

impl AdHosts {
    pub const HOSTNAMES: &'static [&'static str] = &[
        // AdMob
        "a.admob.com",
        "mm.admob.com",
        "p.admob.com",
        "r.admob.com",
        "mmv.admob.com",
        // Amazon
        "aax-fe-sin.amazon-adsystem.com",
        "rcm-na.amazon-adsystem.com",
        "aax-us-east.amazon-adsystem.com",
        "ir-na.amazon-adsystem.com",
        "aax-eu.amazon-adsystem.com",
    ];
}

/// Hosts file locations and the entries that betray an ad blocker
pub struct HostsFiles;

impl HostsFiles {
    /// Candidate paths, in lookup order. Only the first readable one is scanned.
    pub const PATHS: &'static [&'static str] = &[
        "/etc/hosts",
        "/system/etc/hosts",
        "/data/data/hosts",
        r"C:\Windows\System32\drivers\etc\hosts",
    ];

    pub const PATTERNS: &'static [&'static str] = &["admob", "amazon-adsystem"];
}

/// Ad network resources that normally return a non trivial payload
pub struct ProbeUrls;

impl ProbeUrls {
    pub const URLS: &'static [&'static str] = &["http://media.admob.com/sdk-core-v40.js"];

    /// Fewer body bytes than this through a local proxy means tampering
    pub const MIN_PAYLOAD: usize = 4;

    /// How much of the body is read before deciding
    pub const READ_LIMIT: usize = 8;
}

/// Well known hosts used to decide whether the Internet is reachable
pub struct ConnectivityHosts;

impl ConnectivityHosts {
    pub const HOSTS: &'static [&'static str] = &[
        "www.google.com",
        "www.yahoo.com",
        "www.baidu.com",
        "www.msn.com",
        "www.amazon.com",
        "www.ebay.com",
        "www.wikipedia.org",
    ];
}

/// Owned copy of a static list, for probes that accept custom lists
pub(crate) fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_cover_blocked_hosts() {
        for host in AdHosts::HOSTNAMES {
            assert!(
                HostsFiles::PATTERNS.iter().any(|p| host.contains(p)),
                "{host} is not covered by any hosts file pattern"
            );
        }
    }

    #[test]
    fn test_probe_urls_are_valid() {
        for u in ProbeUrls::URLS {
            let parsed = url::Url::parse(u).unwrap();
            assert_eq!(parsed.scheme(), "http");
        }
        assert!(ProbeUrls::MIN_PAYLOAD <= ProbeUrls::READ_LIMIT);
    }
}
