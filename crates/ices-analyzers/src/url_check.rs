use std::sync::OnceLock;

use async_trait::async_trait;
use ices_core::{Analyzer, EmailEvent, Observation, Result};
use regex::Regex;

const SUSPICIOUS_TLDS: &[&str] = &["xyz", "top", "club", "work", "click", "loan", "gq", "ml", "cf", "tk", "ga", "buzz", "surf"];

const SHORTENER_DOMAINS: &[&str] = &["bit.ly", "tinyurl.com", "t.co", "goo.gl", "ow.ly", "is.gd", "buff.ly", "rebrand.ly", "cutt.ly"];

const BRAND_DOMAINS: &[&str] = &["paypal", "microsoft", "apple", "google", "amazon", "netflix", "facebook", "instagram"];

const HOMOGLYPH_SUBSTITUTIONS: &[(&str, &str)] = &[("0", "o"), ("1", "l"), ("l", "i"), ("rn", "m"), ("vv", "w"), ("5", "s"), ("3", "e")];

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("static pattern compiles"))
}

fn ip_literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://\d{1,3}(\.\d{1,3}){3}").expect("static pattern compiles"))
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split("://").nth(1)?;
    Some(rest.split(['/', '?', '#']).next().unwrap_or(rest))
}

fn has_suspicious_tld(host: &str) -> bool {
    host.rsplit('.').next().is_some_and(|tld| SUSPICIOUS_TLDS.contains(&tld.to_ascii_lowercase().as_str()))
}

fn is_shortener(host: &str) -> bool {
    SHORTENER_DOMAINS.iter().any(|short| host.eq_ignore_ascii_case(short))
}

fn has_excessive_subdomains(host: &str) -> bool {
    host.split('.').count() > 4
}

/// Character-substitution normalisation used to catch homoglyph brand
/// impersonation (`paypaI.com`, `micr0soft.com`) without a full Unicode
/// confusables table.
fn normalize_homoglyphs(host: &str) -> String {
    let mut normalized = host.to_ascii_lowercase();
    for (from, to) in HOMOGLYPH_SUBSTITUTIONS {
        normalized = normalized.replace(from, to);
    }
    normalized
}

/// Normalises both the candidate host and each known brand name through the
/// same substitution table before comparing, so a digit-for-letter spelling
/// (`paypa1.com`) and the genuine spelling (`paypal.com`) collapse onto the
/// same normalized form; a host is only flagged when it *isn't* already the
/// brand's own literal spelling.
fn resembles_brand_domain(host: &str) -> bool {
    let normalized_host = normalize_homoglyphs(host);
    let lower_host = host.to_ascii_lowercase();
    BRAND_DOMAINS
        .iter()
        .any(|brand| normalized_host.contains(normalize_homoglyphs(brand).as_str()) && !lower_host.contains(brand))
}

fn is_suspicious(host: &str) -> bool {
    has_suspicious_tld(host) || is_shortener(host) || resembles_brand_domain(host) || has_excessive_subdomains(host)
}

/// Extracts links from the body and flags the shapes most associated with
/// phishing delivery: raw-IP hosts, suspicious TLDs, known shorteners,
/// homoglyph brand impersonation, and hosts with an unusual subdomain depth.
pub struct UrlCheckAnalyzer;

#[async_trait]
impl Analyzer for UrlCheckAnalyzer {
    fn name(&self) -> &str {
        "url_check"
    }

    fn order(&self) -> i32 {
        20
    }

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>> {
        let urls: Vec<&str> = url_pattern().find_iter(&event.body.content).map(|m| m.as_str()).collect();
        let hosts: Vec<&str> = urls.iter().filter_map(|u| host_of(u)).collect();

        let has_ip_url = urls.iter().any(|u| ip_literal_pattern().is_match(u));
        let has_shortener = hosts.iter().any(|h| is_shortener(h));
        let has_homoglyph = hosts.iter().any(|h| resembles_brand_domain(h));
        let has_excessive_subdomains = hosts.iter().any(|h| has_excessive_subdomains(h));
        let suspicious_url_count = hosts.iter().filter(|h| is_suspicious(h)).count();

        Ok(vec![
            Observation::numeric("url_count", urls.len() as f64),
            Observation::numeric("suspicious_url_count", suspicious_url_count as f64),
            Observation::boolean("has_ip_url", has_ip_url),
            Observation::boolean("has_shortener", has_shortener),
            Observation::boolean("has_homoglyph", has_homoglyph),
            Observation::boolean("has_excessive_subdomains", has_excessive_subdomains),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_event;

    fn find<'a>(results: &'a [Observation], key: &str) -> &'a Observation {
        results.iter().find(|o| o.key == key).unwrap()
    }

    #[tokio::test]
    async fn detects_ip_url_and_shortener() {
        let mut event = sample_event();
        event.body.content = "Click http://192.168.1.1/login or http://bit.ly/abc for details".to_string();
        let results = UrlCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(find(&results, "url_count").value.as_f64(), Some(2.0));
        assert_eq!(find(&results, "has_ip_url").value.as_bool(), Some(true));
        assert_eq!(find(&results, "has_shortener").value.as_bool(), Some(true));
    }

    #[tokio::test]
    async fn no_urls_in_body() {
        let event = sample_event();
        let results = UrlCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(find(&results, "url_count").value.as_f64(), Some(0.0));
        assert_eq!(find(&results, "suspicious_url_count").value.as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn flags_suspicious_tld() {
        let mut event = sample_event();
        event.body.content = "Verify now at http://secure-login.xyz/verify".to_string();
        let results = UrlCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(find(&results, "suspicious_url_count").value.as_f64(), Some(1.0));
    }

    #[tokio::test]
    async fn flags_homoglyph_brand_impersonation() {
        let mut event = sample_event();
        event.body.content = "Update your account at http://paypa1-secure.com/login".to_string();
        let results = UrlCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(find(&results, "has_homoglyph").value.as_bool(), Some(true));
    }

    #[tokio::test]
    async fn does_not_flag_the_real_brand_domain_as_homoglyph() {
        let mut event = sample_event();
        event.body.content = "Login at http://paypal.com/login".to_string();
        let results = UrlCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(find(&results, "has_homoglyph").value.as_bool(), Some(false));
    }

    #[tokio::test]
    async fn flags_excessive_subdomains() {
        let mut event = sample_event();
        event.body.content = "http://a.b.c.d.e.example.com/path".to_string();
        let results = UrlCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(find(&results, "has_excessive_subdomains").value.as_bool(), Some(true));
    }
}
