use std::sync::Arc;

use chrono::Utc;
use ices_core::{Action, PolicyOutcome, Verdict};
use ices_policy::PolicyEngine;
use reqwest::Client;
use tracing::info;

use crate::actions::{bec_risk_level, build_delete_request, build_quarantine_body, build_tag_request, risk_label};
use crate::batch_client::BatchClient;
use crate::error::Result;
use crate::token_manager::TokenManager;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub graph_api_beta_base: String,
    pub defender_severity: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            graph_api_beta_base: "https://graph.microsoft.com/beta".to_string(),
            defender_severity: "high".to_string(),
        }
    }
}

/// Routes a verdict through the policy engine to a remediation action.
/// `tag`/`delete` enqueue a sub-request on the shared [`BatchClient`];
/// `quarantine` calls Microsoft Defender's remediation API synchronously,
/// since it isn't part of the mailbox Graph API batch surface. No policy
/// match still produces a `PolicyOutcome` with action `none` — that row is
/// what makes re-processing the same message a dedup no-op rather than a
/// repeated dispatch attempt.
pub struct Dispatcher {
    policy_engine: PolicyEngine,
    batch_client: Arc<BatchClient>,
    token_manager: Arc<TokenManager>,
    http: Client,
    config: DispatcherConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(policy_engine: PolicyEngine, batch_client: Arc<BatchClient>, token_manager: Arc<TokenManager>, config: DispatcherConfig) -> Self {
        Self { policy_engine, batch_client, token_manager, http: Client::new(), config }
    }

    /// # Errors
    /// Returns an error if the chosen action's request couldn't be
    /// enqueued or, for `quarantine`, if the synchronous remediation call
    /// failed.
    pub async fn dispatch(&self, verdict: &Verdict) -> Result<PolicyOutcome> {
        let decision = self.policy_engine.evaluate(verdict);

        let (policy_name, action, matched_observations) = match &decision {
            Some(decision) => (decision.rule_name.clone(), decision.action, serde_json::json!([decision.matched_observation])),
            None => ("no_match".to_string(), Action::None, serde_json::json!([])),
        };

        match action {
            Action::Tag => {
                let label = risk_label(bec_risk_level(verdict).as_deref());
                let request = build_tag_request(&verdict.message_id, verdict, label);
                self.batch_client.add(Some(&verdict.tenant_id), request).await?;
            }
            Action::Delete => {
                let request = build_delete_request(&verdict.message_id, verdict);
                self.batch_client.add(Some(&verdict.tenant_id), request).await?;
            }
            Action::Quarantine => {
                self.quarantine(verdict).await?;
            }
            Action::None => {
                info!(message_id = verdict.message_id, "no policy matched, action none");
            }
        }

        Ok(PolicyOutcome {
            message_id: verdict.message_id.clone(),
            tenant_id: verdict.tenant_id.clone(),
            policy_name,
            action_taken: action,
            matched_observations,
            created_at: Utc::now(),
        })
    }

    async fn quarantine(&self, verdict: &Verdict) -> Result<()> {
        let token = self.token_manager.get_token(Some(&verdict.tenant_id)).await?;
        let url = format!("{}/security/collaboration/analyzedEmails/remediate", self.config.graph_api_beta_base);
        let body = build_quarantine_body(verdict, &self.config.defender_severity);

        let response = self.http.post(&url).bearer_auth(&token).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(crate::error::DispatchError::RemediationFailed { status: status.as_u16(), body: text });
        }
        Ok(())
    }
}
