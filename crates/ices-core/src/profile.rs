use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-tenant behavioural baseline keyed by `(tenant_id, sender_domain)`.
///
/// Invariant: `email_count == sum(typical_categories.values())` once every
/// email has been attributed a category; counters never decrease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderProfile {
    pub tenant_id: String,
    pub sender_domain: String,
    pub email_count: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub known_display_names: HashSet<String>,
    pub typical_categories: HashMap<String, i64>,
    /// hour-of-day (0-23) -> count
    pub typical_send_hours: HashMap<u8, i64>,
    pub reply_to_domains: HashSet<String>,
}

impl SenderProfile {
    pub fn new(tenant_id: impl Into<String>, sender_domain: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            sender_domain: sender_domain.into(),
            email_count: 0,
            first_seen_at: now,
            last_seen_at: now,
            known_display_names: HashSet::new(),
            typical_categories: HashMap::new(),
            typical_send_hours: HashMap::new(),
            reply_to_domains: HashSet::new(),
        }
    }

    pub fn tenure_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.first_seen_at).num_seconds() as f64 / 86400.0
    }

    pub fn is_new(&self, now: DateTime<Utc>) -> bool {
        self.tenure_days(now) < 7.0
    }

    /// Total samples across the category histogram, used as the "enough
    /// history to judge a shift" denominator.
    pub fn total_categories(&self) -> i64 {
        self.typical_categories.values().sum()
    }

    /// Population mean and standard deviation over the hour-of-day
    /// histogram, used by the BEC time-anomaly check.
    pub fn send_hour_stats(&self) -> (f64, f64, i64) {
        let total: i64 = self.typical_send_hours.values().sum();
        if total == 0 {
            return (0.0, 0.0, 0);
        }
        let mean: f64 = self
            .typical_send_hours
            .iter()
            .map(|(hour, count)| f64::from(*hour) * (*count as f64))
            .sum::<f64>()
            / total as f64;
        let variance: f64 = self
            .typical_send_hours
            .iter()
            .map(|(hour, count)| {
                let diff = f64::from(*hour) - mean;
                diff * diff * (*count as f64)
            })
            .sum::<f64>()
            / total as f64;
        (mean, variance.sqrt(), total)
    }
}

/// Keyed by `(tenant_id, sender_address, recipient_address)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderRecipientPair {
    pub tenant_id: String,
    pub sender_address: String,
    pub recipient_address: String,
    /// Denormalised for domain-level aggregation across all addresses at
    /// the sender's domain sending to the same recipient.
    pub sender_domain: String,
    pub message_count: i64,
    pub first_contact_at: DateTime<Utc>,
    pub last_contact_at: DateTime<Utc>,
    pub category_distribution: HashMap<String, i64>,
}

impl SenderRecipientPair {
    pub fn is_first_contact(&self) -> bool {
        self.message_count == 0
    }

    pub fn total_categories(&self) -> i64 {
        self.category_distribution.values().sum()
    }

    pub fn category_ratio(&self, category: &str) -> f64 {
        let total = self.total_categories();
        if total == 0 {
            return 0.0;
        }
        *self.category_distribution.get(category).unwrap_or(&0) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn is_new_boundary_at_seven_days() {
        let now = Utc::now();
        let mut profile = SenderProfile::new("t1", "corp.com", now);

        profile.first_seen_at = now - Duration::days(6) - Duration::hours(23);
        assert!(profile.is_new(now));

        profile.first_seen_at = now - Duration::days(7) - Duration::minutes(1);
        assert!(!profile.is_new(now));
    }

    #[test]
    fn category_shift_denominator_respects_total() {
        let mut profile = SenderProfile::new("t1", "corp.com", Utc::now());
        profile.typical_categories.insert("urgent_action".into(), 1);
        profile.typical_categories.insert("informational".into(), 3);
        assert_eq!(profile.total_categories(), 4);
    }
}
