use chrono::{DateTime, Utc};
use ices_core::{SenderProfile, SenderRecipientPair};

use crate::intent::HIGH_RISK_CATEGORIES;

#[derive(Debug, Clone)]
pub struct ProfileFlags {
    pub is_new_sender: bool,
    pub sender_tenure_days: f64,
    pub display_name_anomaly: bool,
    pub category_shift: bool,
    pub time_anomaly: bool,
    pub reply_to_mismatch: bool,
}

/// Steps 4's sender-domain checks. `profile` is `None` when this is the
/// first time the domain has been seen for the tenant.
#[must_use]
pub fn evaluate_profile(
    profile: Option<&SenderProfile>,
    now: DateTime<Utc>,
    sender_name: Option<&str>,
    category: &str,
    received_hour: u8,
    reply_to_domain: Option<&str>,
) -> ProfileFlags {
    let Some(profile) = profile else {
        return ProfileFlags {
            is_new_sender: true,
            sender_tenure_days: 0.0,
            display_name_anomaly: false,
            category_shift: false,
            time_anomaly: false,
            reply_to_mismatch: false,
        };
    };

    let is_new_sender = profile.is_new(now);
    let sender_tenure_days = profile.tenure_days(now);

    let display_name_anomaly = sender_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .is_some_and(|name| !profile.known_display_names.is_empty() && !profile.known_display_names.contains(name));

    let category_shift = {
        let total = profile.total_categories();
        let category_count = *profile.typical_categories.get(category).unwrap_or(&0);
        let ratio = if total == 0 { 0.0 } else { category_count as f64 / total as f64 };
        HIGH_RISK_CATEGORIES.contains(&category) && total >= 5 && ratio < 0.05
    };

    let time_anomaly = {
        let (mean, stddev, total) = profile.send_hour_stats();
        total >= 10 && stddev > 0.0 && (f64::from(received_hour) - mean).abs() > 2.0 * stddev
    };

    let reply_to_mismatch =
        reply_to_domain.is_some_and(|domain| domain != profile.sender_domain && !profile.reply_to_domains.contains(domain));

    ProfileFlags { is_new_sender, sender_tenure_days, display_name_anomaly, category_shift, time_anomaly, reply_to_mismatch }
}

#[derive(Debug, Clone, Default)]
pub struct PairFlags {
    pub is_first_contact: bool,
    pub low_volume_sensitive_request: bool,
    pub context_escalation: bool,
}

/// Step 4's per-recipient checks, combining the address-level pair with its
/// domain-level aggregate (sum across every address at the sender's domain
/// contacting the same recipient).
#[must_use]
pub fn evaluate_pair(address_pair: Option<&SenderRecipientPair>, domain_pair: Option<&SenderRecipientPair>, category: &str) -> PairFlags {
    let is_high_risk = HIGH_RISK_CATEGORIES.contains(&category);

    let is_first_contact = address_pair.is_none_or(|p| p.message_count == 0);
    let low_volume = is_first_contact || address_pair.is_some_and(|p| p.message_count < 5);
    let low_volume_sensitive_request = is_high_risk && low_volume;

    let context_escalation = [address_pair, domain_pair].into_iter().flatten().any(|pair| {
        let total = pair.total_categories();
        let ratio = pair.category_ratio(category);
        is_high_risk && total >= 3 && ratio < 0.10
    });

    PairFlags { is_first_contact, low_volume_sensitive_request, context_escalation }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    fn base_profile() -> SenderProfile {
        SenderProfile {
            tenant_id: "t1".into(),
            sender_domain: "corp.com".into(),
            email_count: 50,
            first_seen_at: Utc::now() - chrono::Duration::days(200),
            last_seen_at: Utc::now(),
            known_display_names: HashSet::from(["Alice Smith".to_string()]),
            typical_categories: HashMap::from([("informational".to_string(), 48), ("financial_request".to_string(), 2)]),
            typical_send_hours: HashMap::new(),
            reply_to_domains: HashSet::new(),
        }
    }

    #[test]
    fn absent_profile_is_new_sender() {
        let flags = evaluate_profile(None, Utc::now(), Some("Alice"), "informational", 10, None);
        assert!(flags.is_new_sender);
        assert_eq!(flags.sender_tenure_days, 0.0);
    }

    #[test]
    fn unknown_display_name_flags_anomaly() {
        let profile = base_profile();
        let flags = evaluate_profile(Some(&profile), Utc::now(), Some("Mallory"), "informational", 10, None);
        assert!(flags.display_name_anomaly);
    }

    #[test]
    fn known_display_name_does_not_flag() {
        let profile = base_profile();
        let flags = evaluate_profile(Some(&profile), Utc::now(), Some("Alice Smith"), "informational", 10, None);
        assert!(!flags.display_name_anomaly);
    }

    #[test]
    fn rare_high_risk_category_triggers_shift() {
        let profile = base_profile();
        let flags = evaluate_profile(Some(&profile), Utc::now(), None, "financial_request", 10, None);
        assert!(flags.category_shift);
    }

    #[test]
    fn reply_to_domain_not_on_file_is_flagged() {
        let profile = base_profile();
        let flags = evaluate_profile(Some(&profile), Utc::now(), None, "informational", 10, Some("evil.com"));
        assert!(flags.reply_to_mismatch);
    }

    #[test]
    fn reply_to_matching_sender_domain_is_not_flagged() {
        let profile = base_profile();
        let flags = evaluate_profile(Some(&profile), Utc::now(), None, "informational", 10, Some("corp.com"));
        assert!(!flags.reply_to_mismatch);
    }

    #[test]
    fn first_contact_with_high_risk_category_is_low_volume_sensitive() {
        let flags = evaluate_pair(None, None, "urgent_action");
        assert!(flags.is_first_contact);
        assert!(flags.low_volume_sensitive_request);
    }

    #[test]
    fn established_low_risk_pair_has_no_flags() {
        let pair = SenderRecipientPair {
            tenant_id: "t1".into(),
            sender_address: "a@corp.com".into(),
            recipient_address: "b@customer.com".into(),
            sender_domain: "corp.com".into(),
            message_count: 40,
            first_contact_at: Utc::now() - chrono::Duration::days(100),
            last_contact_at: Utc::now(),
            category_distribution: HashMap::from([("informational".to_string(), 40)]),
        };
        let flags = evaluate_pair(Some(&pair), None, "informational");
        assert!(!flags.is_first_contact);
        assert!(!flags.low_volume_sensitive_request);
        assert!(!flags.context_escalation);
    }
}
