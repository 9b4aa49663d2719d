use std::sync::OnceLock;

use async_trait::async_trait;
use ices_core::{Analyzer, EmailEvent, Observation, Result};
use regex::Regex;

fn mechanism_pattern(mechanism: &str) -> &'static Regex {
    static SPF: OnceLock<Regex> = OnceLock::new();
    static DKIM: OnceLock<Regex> = OnceLock::new();
    static DMARC: OnceLock<Regex> = OnceLock::new();
    let cell = match mechanism {
        "spf" => &SPF,
        "dkim" => &DKIM,
        _ => &DMARC,
    };
    cell.get_or_init(|| Regex::new(&format!(r"(?i){mechanism}=(\w+)")).expect("static pattern compiles"))
}

fn mechanism_result(header: &str, mechanism: &str) -> Option<String> {
    mechanism_pattern(mechanism).captures(header).map(|c| c[1].to_ascii_lowercase())
}

fn domain_of(address: &str) -> Option<&str> {
    address.split('@').nth(1)
}

/// Pulls the bracketed or bare address out of a `Return-Path` header, e.g.
/// `<bounce@mailer.example.com>`.
fn return_path_address(header: &str) -> &str {
    header.trim().trim_start_matches('<').trim_end_matches('>')
}

/// Parses SPF/DKIM/DMARC verdicts out of the `Authentication-Results`
/// header (falling back to `Received-SPF` for the SPF mechanism, since some
/// MTAs stamp that separately), the form essentially every inbound MTA
/// stamps after performing the actual checks. We trust the stamped verdict
/// rather than re-running DNS-based checks ourselves — re-verification
/// belongs to the MTA, not a downstream content-security layer.
pub struct HeaderAuthAnalyzer;

#[async_trait]
impl Analyzer for HeaderAuthAnalyzer {
    fn name(&self) -> &str {
        "header_auth"
    }

    fn order(&self) -> i32 {
        10
    }

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>> {
        let auth_results = event.header_ci("authentication-results").unwrap_or_default();
        let received_spf = event.header_ci("received-spf").unwrap_or_default();

        let spf = mechanism_result(auth_results, "spf").or_else(|| mechanism_result(received_spf, "spf"));
        let dkim = mechanism_result(auth_results, "dkim");
        let dmarc = mechanism_result(auth_results, "dmarc");

        let mut observations = vec![
            Observation::pass_fail("spf", spf.unwrap_or_else(|| "none".to_string())),
            Observation::pass_fail("dkim", dkim.unwrap_or_else(|| "none".to_string())),
            Observation::pass_fail("dmarc", dmarc.unwrap_or_else(|| "none".to_string())),
        ];

        if let Some((mismatch, envelope_domain)) = sender_mismatch(event) {
            observations.push(Observation::boolean("sender_mismatch", mismatch));
            if mismatch {
                observations.push(Observation::text("envelope_domain", envelope_domain));
            }
        }

        Ok(observations)
    }
}

/// Compares the `Return-Path` envelope domain against the `From` domain.
/// Returns `None` when there's no `Return-Path` header to compare against.
fn sender_mismatch(event: &EmailEvent) -> Option<(bool, String)> {
    let return_path = event.header_ci("return-path")?;
    let envelope_domain = domain_of(return_path_address(return_path))?.to_ascii_lowercase();
    let from_domain = event.sender_domain()?.to_ascii_lowercase();
    Some((envelope_domain != from_domain, envelope_domain))
}
