use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::Observation;

/// The remediation action a policy rule selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Delete,
    Quarantine,
    Tag,
    None,
}

impl Action {
    /// `delete=4 > quarantine=3 > tag=2 > none=1`; the dispatcher keeps the
    /// highest-priority decision across all matching rules.
    pub fn priority(self) -> u8 {
        match self {
            Action::Delete => 4,
            Action::Quarantine => 3,
            Action::Tag => 2,
            Action::None => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Delete => "delete",
            Action::Quarantine => "quarantine",
            Action::Tag => "tag",
            Action::None => "none",
        }
    }

    /// Whether this action is dispatched through the batch client (`tag`,
    /// `delete`) as opposed to called synchronously (`quarantine`).
    pub fn is_batched(self) -> bool {
        matches!(self, Action::Tag | Action::Delete)
    }
}

/// The outcome of evaluating all policies against one analyzer observation —
/// produced by the policy engine, consumed by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub rule_name: String,
    pub action: Action,
    pub matched_analyzer: String,
    pub matched_observation: Observation,
}

/// Decision record persisted by the remediation worker, keyed by
/// `(message_id, policy_name)`. At most one row per key; re-processing a
/// message updates the existing row in place rather than inserting a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub message_id: String,
    pub tenant_id: String,
    pub policy_name: String,
    pub action_taken: Action,
    pub matched_observations: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
