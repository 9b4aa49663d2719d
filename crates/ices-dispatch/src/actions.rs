use ices_core::Verdict;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// One Graph API `/$batch` sub-request. `id` correlates this entry's
/// response back to the original request when a batch POST's responses
/// come back out of order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSubRequest {
    pub id: String,
    pub method: &'static str,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    pub body: Value,
}

/// Hand-rolled rather than derived: `method` is `&'static str` (every call
/// site builds it from a literal), and `#[derive(Deserialize)]` ties the
/// generated impl's deserializer lifetime to that literal `'static`
/// instead of treating it as an owned value to remap — which would force
/// the buffered JSON itself to live for `'static`. Deserializing into an
/// owned-`String` helper and mapping back onto the known literals avoids
/// that.
impl<'de> Deserialize<'de> for BatchSubRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            id: String,
            method: String,
            url: String,
            #[serde(default)]
            headers: Option<Value>,
            body: Value,
        }

        let helper = Helper::deserialize(deserializer)?;
        let method = match helper.method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PATCH" => "PATCH",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            other => return Err(serde::de::Error::custom(format!("unsupported batch method: {other}"))),
        };
        Ok(Self { id: helper.id, method, url: helper.url, headers: helper.headers, body: helper.body })
    }
}

/// The `ICES: <label>` category tag, derived from the BEC detector's risk
/// level — falls back to "Low Risk" when no `bec_risk_level` observation
/// is present (a rule can fire on a non-BEC analyzer's observation alone).
#[must_use]
pub fn risk_label(bec_risk_level: Option<&str>) -> &'static str {
    match bec_risk_level {
        Some("critical" | "high") => "High Risk",
        Some("medium") => "Suspicious",
        _ => "Low Risk",
    }
}

#[must_use]
pub fn bec_risk_level(verdict: &Verdict) -> Option<String> {
    verdict
        .result_for("bec_detector")
        .and_then(|result| result.find("bec_risk_level"))
        .map(|obs| obs.value.display_string())
}

/// `PATCH /users/{user_id}/messages/{message_id}`, tagging the message with
/// an `ICES: <label>` category and flagging it for the mailbox owner.
#[must_use]
pub fn build_tag_request(id: &str, verdict: &Verdict, label: &str) -> BatchSubRequest {
    BatchSubRequest {
        id: id.to_string(),
        method: "PATCH",
        url: format!("/users/{}/messages/{}", verdict.user_id, verdict.message_id),
        headers: None,
        body: json!({
            "categories": [format!("ICES: {label}")],
            "flag": { "flagStatus": "flagged" },
        }),
    }
}

/// `POST /users/{user_id}/messages/{message_id}/move`, relocating the
/// message to Deleted Items rather than permanently erasing it.
#[must_use]
pub fn build_delete_request(id: &str, verdict: &Verdict) -> BatchSubRequest {
    BatchSubRequest {
        id: id.to_string(),
        method: "POST",
        url: format!("/users/{}/messages/{}/move", verdict.user_id, verdict.message_id),
        headers: None,
        body: json!({ "destinationId": "deleteditems" }),
    }
}

/// Body for Microsoft Defender's `analyzedEmails/remediate` endpoint, one
/// `analyzedEmails` entry per recipient (the message is a single
/// `networkMessageId` delivered to potentially several mailboxes). Falls
/// back to the owning user as the sole recipient when `recipients` is
/// empty — the Graph payload never carried the `to` list through for this
/// message.
#[must_use]
pub fn build_quarantine_body(verdict: &Verdict, severity: &str) -> Value {
    let recipients: Vec<&str> = if verdict.recipients.is_empty() {
        vec![verdict.user_id.as_str()]
    } else {
        verdict.recipients.iter().map(String::as_str).collect()
    };

    let analyzed_emails: Vec<Value> = recipients
        .into_iter()
        .map(|recipient| {
            json!({
                "networkMessageId": verdict.message_id,
                "recipientEmailAddress": recipient,
            })
        })
        .collect();

    json!({
        "displayName": format!("ICES remediation: {}", verdict.message_id),
        "description": format!("Automated remediation triggered by policy match for message {}", verdict.message_id),
        "severity": severity,
        "action": "softDelete",
        "remediateBy": "automation",
        "analyzedEmails": analyzed_emails,
    })
}

#[cfg(test)]
mod tests {
    use ices_core::{AnalysisResult, Observation};

    use super::*;

    fn verdict_with(observations: Vec<Observation>) -> Verdict {
        Verdict {
            message_id: "m1".into(),
            tenant_id: "tenant-a".into(),
            tenant_alias: None,
            user_id: "u1".into(),
            sender: "ceo@vendor.xyz".into(),
            recipients: vec!["cfo@corp.com".into(), "controller@corp.com".into()],
            results: vec![AnalysisResult { analyzer: "bec_detector".into(), observations, processing_time_ms: 1.0 }],
        }
    }

    #[test]
    fn risk_label_maps_critical_and_high_to_high_risk() {
        assert_eq!(risk_label(Some("critical")), "High Risk");
        assert_eq!(risk_label(Some("high")), "High Risk");
        assert_eq!(risk_label(Some("medium")), "Suspicious");
        assert_eq!(risk_label(Some("low")), "Low Risk");
        assert_eq!(risk_label(None), "Low Risk");
    }

    #[test]
    fn tag_request_has_expected_shape() {
        let verdict = verdict_with(vec![]);
        let req = build_tag_request("1", &verdict, "High Risk");
        assert_eq!(req.method, "PATCH");
        assert_eq!(req.url, "/users/u1/messages/m1");
        assert_eq!(req.body["categories"][0], "ICES: High Risk");
        assert_eq!(req.body["flag"]["flagStatus"], "flagged");
    }

    #[test]
    fn delete_request_moves_to_deleted_items() {
        let verdict = verdict_with(vec![]);
        let req = build_delete_request("1", &verdict);
        assert_eq!(req.url, "/users/u1/messages/m1/move");
        assert_eq!(req.body["destinationId"], "deleteditems");
    }

    #[test]
    fn quarantine_body_has_one_entry_per_recipient() {
        let verdict = verdict_with(vec![]);
        let body = build_quarantine_body(&verdict, "high");
        let entries = body["analyzedEmails"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["networkMessageId"], "m1");
        assert_eq!(entries[0]["recipientEmailAddress"], "cfo@corp.com");
        assert_eq!(body["severity"], "high");
        assert_eq!(body["action"], "softDelete");
    }

    #[test]
    fn quarantine_body_falls_back_to_user_id_when_no_recipients() {
        let mut verdict = verdict_with(vec![]);
        verdict.recipients.clear();
        let body = build_quarantine_body(&verdict, "high");
        let entries = body["analyzedEmails"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["recipientEmailAddress"], "u1");
    }
}
