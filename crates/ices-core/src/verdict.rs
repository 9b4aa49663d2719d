use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::event::EmailEvent;

/// Collection shipped from analysis to remediation over the `verdicts` queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub message_id: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_alias: Option<String>,
    pub user_id: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub results: Vec<AnalysisResult>,
}

impl Verdict {
    pub fn from_event(event: &EmailEvent, results: Vec<AnalysisResult>) -> Self {
        Self {
            message_id: event.message_id.clone(),
            tenant_id: event.tenant_id.clone(),
            tenant_alias: event.tenant_alias.clone(),
            user_id: event.user_id.clone(),
            sender: event.sender.clone(),
            recipients: event.recipient_addresses(),
            results,
        }
    }

    pub fn result_for(&self, analyzer: &str) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| r.analyzer == analyzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;

    #[test]
    fn verdict_json_round_trip_preserves_ordered_results() {
        let verdict = Verdict {
            message_id: "m1".into(),
            tenant_id: "t1".into(),
            tenant_alias: Some("alias".into()),
            user_id: "u1".into(),
            sender: "a@b.com".into(),
            recipients: vec!["c@d.com".into()],
            results: vec![
                AnalysisResult {
                    analyzer: "header_auth".into(),
                    observations: vec![Observation::pass_fail("spf", "pass")],
                    processing_time_ms: 1.5,
                },
                AnalysisResult {
                    analyzer: "bec_detector".into(),
                    observations: vec![Observation::numeric("bec_risk_score", 42.0)],
                    processing_time_ms: 3.2,
                },
            ],
        };
        let json = serde_json::to_string(&verdict).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results.len(), 2);
        assert_eq!(back.results[0].analyzer, "header_auth");
        assert_eq!(back.results[1].analyzer, "bec_detector");
        assert_eq!(back.sender, verdict.sender);
    }
}
