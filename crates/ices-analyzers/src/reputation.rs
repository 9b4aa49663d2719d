use std::net::Ipv4Addr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use ices_cache::EphemeralCache;
use ices_core::{Analyzer, EmailEvent, Observation, Result};
use regex::Regex;
use tracing::{debug, warn};

struct IpProvider {
    id: &'static str,
    zone: &'static str,
    codes: Vec<(Ipv4Addr, &'static str)>,
}

struct DomainProvider {
    id: &'static str,
    zone: &'static str,
    codes: Vec<(Ipv4Addr, &'static str)>,
}

fn code(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

/// Providers and return-code tables grounded in the original reputation
/// module: Spamhaus ZEN folds SBL/XBL/CBL/PBL into one zone keyed by the
/// fourth response octet, SpamCop and nix.Spam return a single generic
/// "listed" code, and Spamhaus DBL (a domain, not IP, zone) distinguishes
/// spam/phishing/malware/botnet domains from the "abused legitimate" range.
fn ip_providers() -> &'static [IpProvider] {
    static PROVIDERS: OnceLock<Vec<IpProvider>> = OnceLock::new();
    PROVIDERS
        .get_or_init(|| {
            vec![
                IpProvider {
                    id: "spamhaus_zen",
                    zone: "zen.spamhaus.org",
                    codes: vec![
                        (code(127, 0, 0, 2), "SBL"),
                        (code(127, 0, 0, 3), "SBL-CSS"),
                        (code(127, 0, 0, 4), "XBL-CBL"),
                        (code(127, 0, 0, 5), "XBL-CBL"),
                        (code(127, 0, 0, 6), "XBL-CBL"),
                        (code(127, 0, 0, 7), "XBL-CBL"),
                        (code(127, 0, 0, 9), "SBL-DROP"),
                        (code(127, 0, 0, 10), "PBL"),
                        (code(127, 0, 0, 11), "PBL"),
                    ],
                },
                IpProvider { id: "spamcop", zone: "bl.spamcop.net", codes: vec![(code(127, 0, 0, 2), "Listed")] },
                IpProvider { id: "nix_spam", zone: "ix.dnsbl.manitu.net", codes: vec![(code(127, 0, 0, 2), "Listed")] },
            ]
        })
        .as_slice()
}

fn domain_providers() -> &'static [DomainProvider] {
    static PROVIDERS: OnceLock<Vec<DomainProvider>> = OnceLock::new();
    PROVIDERS
        .get_or_init(|| {
            vec![DomainProvider {
                id: "spamhaus_dbl",
                zone: "dbl.spamhaus.org",
                codes: vec![
                    (code(127, 0, 1, 2), "spam-domain"),
                    (code(127, 0, 1, 4), "phish-domain"),
                    (code(127, 0, 1, 5), "malware-domain"),
                    (code(127, 0, 1, 6), "botnet-cc-domain"),
                    (code(127, 0, 1, 102), "abused-legit-spam"),
                    (code(127, 0, 1, 103), "abused-legit-spam"),
                    (code(127, 0, 1, 104), "abused-legit-phish"),
                    (code(127, 0, 1, 105), "abused-legit-phish"),
                    (code(127, 0, 1, 106), "abused-legit-malware"),
                ],
            }]
        })
        .as_slice()
}

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").expect("static pattern compiles"))
}

fn is_globally_routable(ip: Ipv4Addr) -> bool {
    !(ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_broadcast() || ip.is_unspecified() || ip.is_documentation() || ip.is_multicast())
}

/// Walks the `Received` header chain top-down (as stamped, oldest hop last)
/// and returns the first globally-routable IPv4 address, skipping private
/// and reserved ranges that only ever describe internal relay hops.
fn first_routable_ip(received_chain: &str) -> Option<Ipv4Addr> {
    received_chain.lines().flat_map(|line| ipv4_pattern().find_iter(line)).find_map(|m| {
        let ip: Ipv4Addr = m.as_str().parse().ok()?;
        is_globally_routable(ip).then_some(ip)
    })
}

fn reversed_octets(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}")
}

pub struct ReputationAnalyzer {
    resolver: TokioResolver,
    cache: Arc<dyn EphemeralCache>,
    dns_timeout: Duration,
    cache_ttl: Duration,
}

impl ReputationAnalyzer {
    #[must_use]
    pub fn new(cache: Arc<dyn EphemeralCache>) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
            cache,
            dns_timeout: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(3600),
        }
    }

    fn cache_key(zone: &str, query: &str) -> String {
        format!("dnsbl:{zone}:{query}")
    }

    fn encode(code: Option<Ipv4Addr>) -> String {
        code.map_or_else(|| "-".to_string(), |ip| ip.to_string())
    }

    fn decode(raw: &str) -> Option<Ipv4Addr> {
        if raw == "-" {
            None
        } else {
            raw.parse().ok()
        }
    }

    /// Queries `<label>.<zone>` and returns the A record's last octet-coded
    /// response if the lookup resolved, caching both a positive and an
    /// NXDOMAIN result for an hour so repeat queries against the same
    /// sender/IP within that window never hit the network again.
    async fn query_zone(&self, zone: &str, label: &str) -> Option<Ipv4Addr> {
        let key = Self::cache_key(zone, label);
        match self.cache.get(&key).await {
            Ok(Some(cached)) => return Self::decode(&cached),
            Ok(None) => {}
            Err(err) => warn!(error = %err, zone, "DNSBL cache read failed, checking live"),
        }

        let query = format!("{label}.{zone}.");
        let result = match tokio::time::timeout(self.dns_timeout, self.resolver.lookup_ip(query)).await {
            Ok(Ok(lookup)) => lookup.iter().find_map(|addr| match addr {
                std::net::IpAddr::V4(v4) => Some(v4),
                std::net::IpAddr::V6(_) => None,
            }),
            Ok(Err(err)) => {
                debug!(zone, error = %err, "DNSBL lookup returned no record or resolver error");
                None
            }
            Err(_) => {
                debug!(zone, "DNSBL lookup timed out");
                None
            }
        };

        if let Err(err) = self.cache.set_ex(&key, &Self::encode(result), self.cache_ttl).await {
            warn!(error = %err, zone, "DNSBL cache write failed");
        }

        result
    }
}

#[async_trait]
impl Analyzer for ReputationAnalyzer {
    fn name(&self) -> &str {
        "reputation"
    }

    fn order(&self) -> i32 {
        15
    }

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>> {
        let mut observations = Vec::new();

        let sender_ip = event.header_ci("received").and_then(first_routable_ip);
        observations.push(Observation::text("sender_ip", sender_ip.map(|ip| ip.to_string()).unwrap_or_default()));

        let mut ip_listed = false;
        if let Some(ip) = sender_ip {
            let label = reversed_octets(ip);
            for provider in ip_providers() {
                if let Some(response) = self.query_zone(provider.zone, &label).await {
                    ip_listed = true;
                    observations.push(Observation::boolean(format!("{}_listed", provider.id), true));
                    let code_label = provider.codes.iter().find(|(addr, _)| *addr == response).map_or("unknown", |(_, label)| label);
                    observations.push(Observation::text(format!("{}_code", provider.id), code_label));
                }
            }
        }
        observations.push(Observation::boolean("ip_listed", ip_listed));

        let mut domain_listed = false;
        if let Some(domain) = event.sender_domain() {
            for provider in domain_providers() {
                if let Some(response) = self.query_zone(provider.zone, domain).await {
                    domain_listed = true;
                    observations.push(Observation::boolean(format!("{}_listed", provider.id), true));
                    let code_label = provider.codes.iter().find(|(addr, _)| *addr == response).map_or("unknown", |(_, label)| label);
                    observations.push(Observation::text(format!("{}_code", provider.id), code_label));
                }
            }
        }
        observations.push(Observation::boolean("domain_listed", domain_listed));

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_routable_ip_skips_private_hops() {
        let chain = "from mail.internal (10.0.0.5) by mx.example.com;\nfrom relay.example.com (93.184.216.34) by edge;";
        assert_eq!(first_routable_ip(chain), Some(Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[test]
    fn first_routable_ip_returns_none_when_all_private() {
        let chain = "from mail.internal (10.0.0.5) by mx.example.com;\nfrom relay (192.168.1.1) by edge;";
        assert_eq!(first_routable_ip(chain), None);
    }

    #[test]
    fn reversed_octets_flips_ipv4() {
        assert_eq!(reversed_octets(Ipv4Addr::new(1, 2, 3, 4)), "4.3.2.1");
    }

    #[test]
    fn encode_decode_round_trips_a_listed_code() {
        let encoded = ReputationAnalyzer::encode(Some(Ipv4Addr::new(127, 0, 0, 2)));
        assert_eq!(ReputationAnalyzer::decode(&encoded), Some(Ipv4Addr::new(127, 0, 0, 2)));
    }

    #[test]
    fn encode_decode_round_trips_not_listed() {
        let encoded = ReputationAnalyzer::encode(None);
        assert_eq!(ReputationAnalyzer::decode(&encoded), None);
    }
}
