// ── Network Health Probe ─────────────────────────────────────────────────────
// DNS + TCP probes grounded in `bot.py::_check_dns_resolution`/
// `_check_network_connectivity` (see examples/original_source). See
// SPEC_FULL.md §4.6.3 for the exact diagnostics shape and fallback chain.
//
// `hickory-resolver` is used for the alternative-resolver fallback chain; the
// teacher's own stack has no DNS-resolution crate (it relies on the OS
// resolver only through `reqwest`), so this is a pack-wide ecosystem addition
// — see DESIGN.md.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tokio::net::TcpStream;
use tokio::time::timeout;

const ALTERNATIVE_RESOLVERS: &[&str] = &["8.8.8.8", "1.1.1.1", "208.67.222.222", "9.9.9.9"];
const DNS_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
const DNS_TOTAL_BUDGET: Duration = Duration::from_secs(10);
const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const LOG_EVERY_N_CALLS: u64 = 60;

#[derive(Debug, Clone, Default)]
pub struct DnsDiagnostics {
    pub hostname: String,
    pub primary_error: Option<String>,
    pub resolved_with: Option<String>,
    pub resolved_ip: Option<String>,
    pub alternative_dns_failed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkDiagnostics {
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub endpoints_tried: Vec<String>,
}

pub struct HealthProbe {
    dns_call_count: AtomicU64,
    tcp_call_count: AtomicU64,
}

impl HealthProbe {
    pub fn new() -> Self {
        Self { dns_call_count: AtomicU64::new(0), tcp_call_count: AtomicU64::new(0) }
    }

    /// Try the OS resolver first; on failure, iterate the alternative
    /// resolver list within a shared total-lifetime budget.
    pub async fn check_dns(&self, hostname: &str) -> (bool, DnsDiagnostics) {
        let count = self.dns_call_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut diag = DnsDiagnostics { hostname: hostname.to_string(), ..Default::default() };

        match timeout(DNS_QUERY_TIMEOUT, tokio::net::lookup_host(format!("{hostname}:443"))).await {
            Ok(Ok(mut addrs)) => {
                if addrs.next().is_some() {
                    diag.resolved_with = Some("system".to_string());
                    if count % LOG_EVERY_N_CALLS == 0 {
                        log::info!("[channel] DNS probe ok via system resolver (call #{count})");
                    }
                    return (true, diag);
                } else {
                    diag.primary_error = Some("system resolver returned no records".to_string());
                }
            }
            Ok(Err(e)) => diag.primary_error = Some(e.to_string()),
            Err(_) => diag.primary_error = Some("system resolver timed out".to_string()),
        }

        let deadline = tokio::time::Instant::now() + DNS_TOTAL_BUDGET;
        for server in ALTERNATIVE_RESOLVERS {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            let Ok(ip): Result<IpAddr, _> = server.parse() else { continue };
            let config = ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::from_ips_clear(&[ip], 53, true));
            let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());
            match timeout(DNS_QUERY_TIMEOUT, resolver.lookup_ip(hostname)).await {
                Ok(Ok(lookup)) => {
                    if let Some(resolved_ip) = lookup.iter().next() {
                        diag.resolved_with = Some(server.to_string());
                        diag.resolved_ip = Some(resolved_ip.to_string());
                        if count % LOG_EVERY_N_CALLS == 0 {
                            log::info!("[channel] DNS probe ok via fallback {server} (call #{count})");
                        }
                        return (true, diag);
                    }
                    diag.alternative_dns_failed.push(server.to_string());
                }
                _ => diag.alternative_dns_failed.push(server.to_string()),
            }
        }

        (false, diag)
    }

    /// Iterate a fixed endpoint list; success on the first short-circuits.
    pub async fn check_tcp(&self, endpoints: &[(&str, u16)]) -> (bool, NetworkDiagnostics) {
        let count = self.tcp_call_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut diag = NetworkDiagnostics::default();

        for (host, port) in endpoints {
            diag.endpoints_tried.push(format!("{host}:{port}"));
            let addr_result = tokio::net::lookup_host((*host, *port)).await;
            let Ok(mut addrs) = addr_result else {
                diag.error_type = Some("dns".to_string());
                diag.error_message = Some(format!("could not resolve {host}"));
                continue;
            };
            let Some(addr): Option<SocketAddr> = addrs.next() else { continue };
            match timeout(TCP_CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
                Ok(Ok(_)) => {
                    if count % LOG_EVERY_N_CALLS == 0 {
                        log::info!("[channel] TCP probe ok to {host}:{port} (call #{count})");
                    }
                    return (true, diag);
                }
                Ok(Err(e)) => {
                    diag.error_type = Some("connect".to_string());
                    diag.error_message = Some(e.to_string());
                }
                Err(_) => {
                    diag.error_type = Some("timeout".to_string());
                    diag.error_message = Some(format!("connect to {host}:{port} timed out"));
                }
            }
        }

        (false, diag)
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dns_diagnostics_carries_hostname_on_failure() {
        let probe = HealthProbe::new();
        let (_, diag) = probe.check_dns("this-host-does-not-exist.invalid").await;
        assert_eq!(diag.hostname, "this-host-does-not-exist.invalid");
    }

    #[tokio::test]
    async fn tcp_diagnostics_records_every_endpoint_tried() {
        let probe = HealthProbe::new();
        let endpoints = [("127.0.0.1", 1u16), ("127.0.0.1", 2u16)];
        let (ok, diag) = probe.check_tcp(&endpoints).await;
        assert!(!ok);
        assert_eq!(diag.endpoints_tried.len(), 2);
    }

    #[tokio::test]
    async fn call_counter_increments_regardless_of_outcome() {
        let probe = HealthProbe::new();
        probe.check_dns("invalid.invalid").await;
        probe.check_dns("invalid.invalid").await;
        assert_eq!(probe.dns_call_count.load(Ordering::Relaxed), 2);
    }
}
