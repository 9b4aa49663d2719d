use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use ices_core::{Analyzer, EmailEvent, Observation, Result};
use ices_store::BecStore;

use crate::behavior::{self, PairFlags};
use crate::html;
use crate::intent;
use crate::scoring;
use crate::signals;

/// Behavioural business-email-compromise detector. Read-only during
/// [`Analyzer::observe`] — the profile/pair counters it reads are only
/// updated afterward via [`post_analyze_update`], once the verdict this
/// observation feeds into has actually been persisted.
pub struct BecAnalyzer {
    store: Arc<BecStore>,
}

impl BecAnalyzer {
    #[must_use]
    pub fn new(store: Arc<BecStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Analyzer for BecAnalyzer {
    fn name(&self) -> &str {
        "bec_detector"
    }

    fn order(&self) -> i32 {
        45
    }

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>> {
        let text = html::prepare_text(&event.subject, &event.body);
        let content = signals::scan(&text);
        let intent = intent::classify_intent(&text);

        let sender_domain = event.sender_domain().unwrap_or_default();
        let reply_to_domain = event.header_ci("reply-to").and_then(extract_domain);
        let received_hour = event.received_at.hour() as u8;

        let profile = match self.store.get_sender_profile(&event.tenant_id, sender_domain).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(error = %err, tenant_id = %event.tenant_id, "sender profile lookup failed, treating as unknown sender");
                None
            }
        };

        let profile_flags = behavior::evaluate_profile(
            profile.as_ref(),
            event.received_at,
            event.sender_name.as_deref(),
            &intent.category,
            received_hour,
            reply_to_domain.as_deref(),
        );

        let pair_flags = self.aggregate_pair_flags(event, sender_domain, &intent.category).await;

        let risk = scoring::compute(&intent.category, intent.confidence, &profile_flags, &pair_flags, &content);

        Ok(vec![
            Observation::numeric("bec_risk_score", f64::from(risk.score)),
            Observation::text("bec_risk_level", risk.level),
            Observation::text("intent_category", intent.category.clone()),
            Observation::numeric("intent_confidence", f64::from(intent.confidence)),
            Observation::numeric("sender_tenure_days", profile_flags.sender_tenure_days),
            Observation::boolean("is_new_sender", profile_flags.is_new_sender),
            Observation::boolean("display_name_anomaly", profile_flags.display_name_anomaly),
            Observation::boolean("category_shift", profile_flags.category_shift),
            Observation::boolean("time_anomaly", profile_flags.time_anomaly),
            Observation::boolean("reply_to_mismatch", profile_flags.reply_to_mismatch),
            Observation::boolean("is_first_contact", pair_flags.is_first_contact),
            Observation::boolean("low_volume_sensitive_request", pair_flags.low_volume_sensitive_request),
            Observation::boolean("context_escalation", pair_flags.context_escalation),
            Observation::boolean("content_has_financial_entities", content.has_financial_entities),
            Observation::boolean("content_has_payment_instructions", content.has_payment_instructions),
            Observation::boolean("content_has_urgency_language", content.has_urgency_language),
            Observation::numeric("content_urgency_score", f64::from(content.urgency_score)),
            Observation::numeric("content_formality_score", f64::from(content.formality_score)),
            Observation::text(
                "content_financial_entities",
                if content.financial_entities.is_empty() { "none".to_string() } else { content.financial_entities.join(", ") },
            ),
            Observation::text(
                "topics_detected",
                if intent.topics_detected.is_empty() { intent.category.clone() } else { intent.topics_detected.join(", ") },
            ),
            Observation::boolean("content_has_personal_info", content.has_personal_info_request),
        ])
    }
}

impl BecAnalyzer {
    /// Unions the per-recipient flags across every `to` address: any
    /// recipient seeing this as a first contact or an escalation is enough
    /// to surface the risk for the message as a whole.
    async fn aggregate_pair_flags(&self, event: &EmailEvent, sender_domain: &str, category: &str) -> PairFlags {
        let mut aggregate = PairFlags::default();

        for recipient in &event.to {
            let address_pair = match self.store.get_sender_recipient_pair(&event.tenant_id, &event.sender, &recipient.address).await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "sender-recipient pair lookup failed, treating as no history");
                    None
                }
            };
            let domain_pair = match self.store.get_domain_pair_summary(&event.tenant_id, sender_domain, &recipient.address).await {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "domain-pair summary lookup failed, treating as no history");
                    None
                }
            };

            let flags = behavior::evaluate_pair(address_pair.as_ref(), domain_pair.as_ref(), category);
            aggregate.is_first_contact |= flags.is_first_contact;
            aggregate.low_volume_sensitive_request |= flags.low_volume_sensitive_request;
            aggregate.context_escalation |= flags.context_escalation;
        }

        aggregate
    }
}

/// Updates the sender's behavioural baseline and every recipient pair after
/// a verdict has been persisted. Never called from [`Analyzer::observe`] —
/// best-effort, logged on failure rather than surfaced, since a missed
/// counter bump only slightly stales the next message's baseline.
pub async fn post_analyze_update(store: &BecStore, event: &EmailEvent, intent_category: &str, now: DateTime<Utc>) {
    let sender_domain = event.sender_domain().unwrap_or_default();
    let reply_to_domain = event.header_ci("reply-to").and_then(extract_domain);
    let received_hour = event.received_at.hour() as u8;

    if let Err(err) = store
        .upsert_sender_profile(&event.tenant_id, sender_domain, now, event.sender_name.as_deref(), intent_category, received_hour, reply_to_domain.as_deref())
        .await
    {
        tracing::warn!(error = %err, tenant_id = %event.tenant_id, "sender profile update failed");
    }

    for recipient in &event.to {
        if let Err(err) = store
            .upsert_sender_recipient_pair(&event.tenant_id, &event.sender, &recipient.address, sender_domain, now, intent_category)
            .await
        {
            tracing::warn!(error = %err, recipient = %recipient.address, "sender-recipient pair update failed");
        }
    }
}

fn extract_domain(raw: &str) -> Option<String> {
    let at = raw.rfind('@')?;
    let domain: String = raw[at + 1..].chars().take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-').collect();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_domain_handles_display_name_wrapped_address() {
        assert_eq!(extract_domain("Finance Team <ap@vendor.example>"), Some("vendor.example".to_string()));
    }

    #[test]
    fn extract_domain_none_without_at_sign() {
        assert_eq!(extract_domain("not-an-address"), None);
    }
}
