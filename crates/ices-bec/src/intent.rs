use crate::classifier::classifier;

pub const INTENT_LABELS: &[&str] =
    &["urgent_action", "financial_request", "credential_request", "authority_impersonation", "relationship_building", "informational", "transactional"];

pub const HIGH_RISK_CATEGORIES: &[&str] = &["urgent_action", "financial_request", "credential_request"];

#[must_use]
pub fn category_risk_weight(category: &str) -> f64 {
    match category {
        "urgent_action" | "financial_request" => 1.0,
        "credential_request" => 0.9,
        "authority_impersonation" => 0.7,
        "relationship_building" => 0.4,
        "informational" => 0.1,
        "transactional" => 0.05,
        _ => 0.1,
    }
}

pub struct IntentResult {
    pub category: String,
    /// 0-100
    pub confidence: u32,
    pub topics_detected: Vec<String>,
}

/// Runs the first 500 characters of `text` through the shared multi-label
/// classifier. Falls back to `informational`/confidence 0 when no model is
/// configured, matching the contract every other caller of `classifier()`
/// relies on.
#[must_use]
pub fn classify_intent(text: &str) -> IntentResult {
    let window: String = text.chars().take(500).collect();

    let Some(model) = classifier() else {
        return IntentResult { category: "informational".to_string(), confidence: 0, topics_detected: Vec::new() };
    };

    let scores = model.classify(&window, INTENT_LABELS);
    let top = scores.iter().max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let (category, confidence) = top.map_or_else(
        || ("informational".to_string(), 0),
        |(label, score)| (label.clone(), (score * 100.0).round() as u32),
    );

    let topics_detected = scores.into_iter().filter(|(_, score)| *score > 0.30).map(|(label, _)| label).collect();

    IntentResult { category, confidence, topics_detected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_informational_without_a_model() {
        let result = classify_intent("Please wire the funds immediately, this is urgent.");
        assert_eq!(result.category, "informational");
        assert_eq!(result.confidence, 0);
        assert!(result.topics_detected.is_empty());
    }

    #[test]
    fn risk_weights_rank_high_risk_categories_highest() {
        assert!(category_risk_weight("urgent_action") > category_risk_weight("informational"));
        assert!(category_risk_weight("financial_request") > category_risk_weight("transactional"));
    }
}
