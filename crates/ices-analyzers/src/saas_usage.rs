use async_trait::async_trait;
use ices_bec::{catalog, classifier, html};
use ices_core::{Analyzer, EmailEvent, Observation, Result};

const USAGE_LABELS: &[&str] = &["usage", "marketing"];

const MARKETING_MAILERS: &[&str] = &["mailchimp", "sendgrid", "marketo", "hubspot", "pardot", "constant contact"];

/// Flags mail from a known SaaS vendor domain and, only then, classifies it
/// as day-to-day transactional usage versus marketing/newsletter traffic —
/// the distinction the BEC scorer leans on to avoid mistaking a genuine
/// DocuSign envelope notification for a phishing lure riding the same brand.
pub struct SaasUsageAnalyzer;

#[async_trait]
impl Analyzer for SaasUsageAnalyzer {
    fn name(&self) -> &str {
        "saas_usage"
    }

    fn order(&self) -> i32 {
        50
    }

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>> {
        let domain = event.sender_domain().unwrap_or_default();
        let Some(provider) = catalog::lookup(domain) else {
            return Ok(vec![Observation::boolean("is_saas", false)]);
        };

        let mut observations = vec![Observation::boolean("is_saas", true), Observation::text("saas_provider", provider.name)];

        let subject = event.subject.clone();
        let body = event.body.clone();
        let (category, base_confidence) = tokio::task::spawn_blocking(move || classify(&subject, &body))
            .await
            .unwrap_or_else(|_| ("usage".to_string(), 0));

        let marketing_signals = marketing_signal_count(event);
        let adjustment = i64::from(marketing_signals) * 5;
        let confidence = if category == "marketing" {
            i64::from(base_confidence) + adjustment
        } else {
            i64::from(base_confidence) - adjustment
        }
        .clamp(0, 100);

        observations.push(Observation::text("saas_content_category", category));
        observations.push(Observation::numeric("saas_content_confidence", confidence as f64));

        Ok(observations)
    }
}

fn classify(subject: &str, body: &ices_core::EmailBody) -> (String, u32) {
    let window: String = html::prepare_text(subject, body).chars().take(500).collect();

    let Some(model) = classifier() else {
        return ("usage".to_string(), 0);
    };

    let scores = model.classify(&window, USAGE_LABELS);
    scores
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map_or_else(|| ("usage".to_string(), 0), |(label, score)| (label, (score * 100.0).round() as u32))
}

fn marketing_signal_count(event: &EmailEvent) -> u32 {
    let mut count = 0;
    if event.header_ci("list-unsubscribe").is_some() {
        count += 1;
    }
    if event
        .header_ci("precedence")
        .is_some_and(|v| v.to_ascii_lowercase().contains("bulk") || v.to_ascii_lowercase().contains("list"))
    {
        count += 1;
    }
    if event.header_ci("auto-submitted").is_some() {
        count += 1;
    }
    if event
        .header_ci("x-mailer")
        .is_some_and(|v| MARKETING_MAILERS.iter().any(|m| v.to_ascii_lowercase().contains(m)))
    {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::sample_event;

    #[tokio::test]
    async fn unknown_vendor_domain_is_not_saas() {
        let event = sample_event();
        let results = SaasUsageAnalyzer.observe(&event).await.unwrap();
        assert_eq!(results.iter().find(|o| o.key == "is_saas").unwrap().value.as_bool(), Some(false));
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn known_vendor_domain_is_flagged_with_provider_name() {
        let mut event = sample_event();
        event.sender = "no-reply@docusign.net".to_string();
        let results = SaasUsageAnalyzer.observe(&event).await.unwrap();
        assert_eq!(results.iter().find(|o| o.key == "saas_provider").unwrap().value.display_string(), "DocuSign");
    }

    #[tokio::test]
    async fn marketing_headers_push_confidence_toward_marketing_without_a_model() {
        let mut event = sample_event();
        event.sender = "no-reply@docusign.net".to_string();
        let mut headers = HashMap::new();
        headers.insert("List-Unsubscribe".to_string(), "<mailto:unsub@docusign.net>".to_string());
        event.headers = headers;
        let results = SaasUsageAnalyzer.observe(&event).await.unwrap();
        // no classifier configured -> defaults to "usage", so a marketing
        // header only pulls its confidence down, never re-labels it.
        assert_eq!(results.iter().find(|o| o.key == "saas_content_category").unwrap().value.display_string(), "usage");
        assert_eq!(results.iter().find(|o| o.key == "saas_content_confidence").unwrap().value.as_f64(), Some(0.0));
    }
}
