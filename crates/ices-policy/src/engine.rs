use ices_core::{Observation, ObservationValue, PolicyDecision, Verdict};

use crate::matcher::{any_pattern_matches, glob_matches, tenant_matches};
use crate::rule::{Operator, PolicyRule};

/// An ordered set of rules evaluated against every verdict. Rule order is
/// significant: it's the tiebreaker when two rules match at the same
/// action priority.
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
}

impl PolicyEngine {
    #[must_use]
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Evaluates every rule against `verdict`, returning the highest-priority
    /// matching decision (`None` if no rule matched at all — the dispatcher
    /// treats that as action `none`).
    #[must_use]
    pub fn evaluate(&self, verdict: &Verdict) -> Option<PolicyDecision> {
        let mut best: Option<PolicyDecision> = None;

        for rule in &self.rules {
            if !self.scope_matches(rule, verdict) {
                continue;
            }
            let Some(decision) = evaluate_when(rule, verdict) else { continue };

            best = match best {
                Some(current) if decision.action.priority() > current.action.priority() => Some(decision),
                Some(current) => Some(current),
                None => Some(decision),
            };
        }

        best
    }

    fn scope_matches(&self, rule: &PolicyRule, verdict: &Verdict) -> bool {
        tenant_matches(&rule.tenant, &verdict.tenant_id, verdict.tenant_alias.as_deref())
            && (rule.sender == "*" || glob_matches(&rule.sender, &verdict.sender))
            && (matches!(rule.recipients.patterns(), [p] if p == "*")
                || verdict.recipients.iter().any(|recipient| any_pattern_matches(rule.recipients.patterns(), recipient)))
    }
}

fn evaluate_when(rule: &PolicyRule, verdict: &Verdict) -> Option<PolicyDecision> {
    let clause = &rule.when;

    let found = verdict
        .results
        .iter()
        .filter(|result| clause.analyzer.includes(&result.analyzer))
        .find_map(|result| result.find(&clause.observation).map(|obs| (result.analyzer.as_str(), obs)));

    match &clause.operator {
        Operator::Exists { exists } => {
            if found.is_some() != *exists {
                return None;
            }
            let (analyzer, observation) = found?;
            Some(make_decision(rule, analyzer, observation))
        }
        Operator::Equals { equals } => {
            let (analyzer, observation) = found?;
            operator_equals(&observation.value, equals).then(|| make_decision(rule, analyzer, observation))
        }
        Operator::Gte { gte } => {
            let (analyzer, observation) = found?;
            observation.value.as_f64().filter(|v| v >= gte).map(|_| make_decision(rule, analyzer, observation))
        }
        Operator::Lte { lte } => {
            let (analyzer, observation) = found?;
            observation.value.as_f64().filter(|v| v <= lte).map(|_| make_decision(rule, analyzer, observation))
        }
        Operator::Contains { contains } => {
            let (analyzer, observation) = found?;
            observation
                .value
                .display_string()
                .to_ascii_lowercase()
                .contains(&contains.to_ascii_lowercase())
                .then(|| make_decision(rule, analyzer, observation))
        }
    }
}

fn operator_equals(value: &ObservationValue, target: &str) -> bool {
    if let ObservationValue::Boolean(actual) = value {
        let target_bool = matches!(target.to_ascii_lowercase().as_str(), "true" | "1");
        return *actual == target_bool;
    }
    value.display_string().eq_ignore_ascii_case(target)
}

fn make_decision(rule: &PolicyRule, analyzer: &str, observation: &Observation) -> PolicyDecision {
    PolicyDecision {
        rule_name: rule.name.clone(),
        action: rule.action,
        matched_analyzer: analyzer.to_string(),
        matched_observation: observation.clone(),
    }
}

#[cfg(test)]
mod tests {
    use ices_core::{Action, AnalysisResult};

    use super::*;
    use crate::rule::{AnalyzerScope, ScopePattern, WhenClause};

    fn verdict_with(observations: Vec<Observation>) -> Verdict {
        Verdict {
            message_id: "m1".into(),
            tenant_id: "tenant-a".into(),
            tenant_alias: None,
            user_id: "u1".into(),
            sender: "new-ceo@vendor.xyz".into(),
            recipients: vec!["cfo@corp.com".into()],
            results: vec![AnalysisResult { analyzer: "bec_detector".into(), observations, processing_time_ms: 1.0 }],
        }
    }

    fn rule(name: &str, sender: &str, observation: &str, operator: Operator, action: Action) -> PolicyRule {
        PolicyRule {
            name: name.to_string(),
            tenant: "*".to_string(),
            sender: sender.to_string(),
            recipients: ScopePattern::One("*".to_string()),
            when: WhenClause { analyzer: AnalyzerScope::All, observation: observation.to_string(), operator },
            action,
        }
    }

    #[test]
    fn gte_rule_matches_high_risk_score() {
        let verdict = verdict_with(vec![Observation::numeric("bec_risk_score", 80.0)]);
        let engine = PolicyEngine::new(vec![rule("high-risk", "*", "bec_risk_score", Operator::Gte { gte: 75.0 }, Action::Quarantine)]);
        let decision = engine.evaluate(&verdict).unwrap();
        assert_eq!(decision.rule_name, "high-risk");
        assert_eq!(decision.action, Action::Quarantine);
    }

    #[test]
    fn non_matching_sender_scope_is_skipped() {
        let verdict = verdict_with(vec![Observation::numeric("bec_risk_score", 80.0)]);
        let engine = PolicyEngine::new(vec![rule("only-xyz", "*@*.com", "bec_risk_score", Operator::Gte { gte: 75.0 }, Action::Quarantine)]);
        assert!(engine.evaluate(&verdict).is_none());
    }

    #[test]
    fn highest_priority_action_wins_across_rules() {
        let verdict = verdict_with(vec![Observation::numeric("bec_risk_score", 80.0), Observation::boolean("auth_failed", true)]);
        let engine = PolicyEngine::new(vec![
            rule("tag-rule", "*", "bec_risk_score", Operator::Gte { gte: 50.0 }, Action::Tag),
            rule("delete-rule", "*", "auth_failed", Operator::Equals { equals: "true".into() }, Action::Delete),
        ]);
        let decision = engine.evaluate(&verdict).unwrap();
        assert_eq!(decision.rule_name, "delete-rule");
    }

    #[test]
    fn tie_at_same_priority_keeps_first_matching_rule() {
        let verdict = verdict_with(vec![Observation::numeric("bec_risk_score", 80.0), Observation::boolean("auth_failed", true)]);
        let engine = PolicyEngine::new(vec![
            rule("first-tag", "*", "bec_risk_score", Operator::Gte { gte: 50.0 }, Action::Tag),
            rule("second-tag", "*", "auth_failed", Operator::Equals { equals: "true".into() }, Action::Tag),
        ]);
        let decision = engine.evaluate(&verdict).unwrap();
        assert_eq!(decision.rule_name, "first-tag");
    }

    #[test]
    fn equals_coerces_boolean_observation_from_string() {
        let verdict = verdict_with(vec![Observation::boolean("auth_failed", true)]);
        let engine = PolicyEngine::new(vec![rule("bool-eq", "*", "auth_failed", Operator::Equals { equals: "true".into() }, Action::Tag)]);
        assert!(engine.evaluate(&verdict).is_some());
    }
}
