//! Host allow-list and local-development host detection.

use std::net::IpAddr;
use std::sync::LazyLock;

use ipnet::IpNet;
use url::Host;

/// Loopback, private and link-local ranges treated as local development.
static LOCAL_NETWORKS: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    [
        "127.0.0.0/8",
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "169.254.0.0/16",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .filter_map(|net| net.parse().ok())
    .collect()
});

/// Whether `ip` is a loopback or private-network address.
pub fn is_local_ip(ip: IpAddr) -> bool {
    LOCAL_NETWORKS.iter().any(|net| net.contains(&ip))
}

/// Whether `host` is a local-development host.
///
/// This covers:
/// - `localhost` and `*.localhost`
/// - mDNS names (`*.local`)
/// - loopback addresses (127.0.0.0/8, ::1)
/// - RFC 1918 private ranges and link-local addresses
/// - IPv6 unique local (fc00::/7)
pub fn is_local_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".local")
        }
        Host::Ipv4(v4) => is_local_ip(IpAddr::V4(*v4)),
        Host::Ipv6(v6) => is_local_ip(IpAddr::V6(*v6)),
    }
}

/// Hostnames eligible for caching.
#[derive(Debug, Clone, Default)]
pub struct HostAllowList {
    hosts: Vec<String>,
}

impl HostAllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        hosts.sort();
        hosts.dedup();
        Self { hosts }
    }

    /// Exact match or a subdomain of an allowed host.
    pub fn allows(&self, hostname: &str) -> bool {
        let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
        self.hosts.iter().any(|allowed| {
            hostname == *allowed
                || hostname
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}
