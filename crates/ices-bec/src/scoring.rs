use crate::behavior::{PairFlags, ProfileFlags};
use crate::intent::category_risk_weight;
use crate::signals::ContentSignals;

#[derive(Debug, Clone, Copy)]
pub struct RiskScore {
    pub score: u32,
    pub level: &'static str,
}

/// Composite score: behavioural flags are dampened by classifier
/// confidence (floor 0.3) since they're corroborating evidence for an
/// uncertain intent call; content signals are hard evidence from regex
/// matches and are added undampened afterward.
#[must_use]
pub fn compute(intent_category: &str, intent_confidence: u32, profile: &ProfileFlags, pair: &PairFlags, content: &ContentSignals) -> RiskScore {
    let base = category_risk_weight(intent_category) * 30.0;

    let mut behavioural = base;
    behavioural += flag_weight(profile.is_new_sender, 15.0);
    behavioural += flag_weight(profile.display_name_anomaly, 10.0);
    behavioural += flag_weight(profile.category_shift, 20.0);
    behavioural += flag_weight(profile.time_anomaly, 10.0);
    behavioural += flag_weight(profile.reply_to_mismatch, 15.0);
    behavioural += flag_weight(pair.is_first_contact, 10.0);
    behavioural += flag_weight(pair.low_volume_sensitive_request, 15.0);
    behavioural += flag_weight(pair.context_escalation, 15.0);

    let dampener = (f64::from(intent_confidence) / 100.0).max(0.3);
    let mut total = behavioural * dampener;

    total += flag_weight(content.has_financial_entities, 20.0);
    total += flag_weight(content.has_payment_instructions, 15.0);
    total += flag_weight(content.has_urgency_language, 10.0);
    total += flag_weight(content.has_credential_request, 15.0);
    total += flag_weight(content.has_personal_info_request, 10.0);

    let score = total.round().clamp(0.0, 100.0) as u32;
    RiskScore { score, level: level_for(score) }
}

fn flag_weight(flag: bool, weight: f64) -> f64 {
    if flag {
        weight
    } else {
        0.0
    }
}

fn level_for(score: u32) -> &'static str {
    match score {
        75..=u32::MAX => "critical",
        50..=74 => "high",
        25..=49 => "medium",
        _ => "low",
    }
}
