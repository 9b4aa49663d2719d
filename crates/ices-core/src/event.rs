use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One `to` recipient.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Recipient {
    pub address: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyContentType {
    Text,
    Html,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailBody {
    pub content_type: BodyContentType,
    #[serde(default)]
    pub content: String,
}

impl Default for EmailBody {
    fn default() -> Self {
        Self {
            content_type: BodyContentType::Text,
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
    /// Base64-encoded content, or empty when the body wasn't attached.
    #[serde(default)]
    pub content_bytes: String,
}

/// Input to the analysis pipeline. Constructed once per message from the
/// `emails` queue payload, immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct EmailEvent {
    pub message_id: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_alias: Option<String>,
    pub user_id: String,
    pub received_at: DateTime<Utc>,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub to: Vec<Recipient>,
    #[serde(default)]
    pub subject: String,
    pub body: EmailBody,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl EmailEvent {
    /// Case-sensitive header lookup, per the queue contract.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Case-insensitive header lookup, used by analyzers that need to be
    /// tolerant of transport capitalization drift (e.g. `received-spf` vs
    /// `Received-SPF`).
    pub fn header_ci(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn sender_domain(&self) -> Option<&str> {
        self.sender.split('@').nth(1)
    }

    pub fn recipient_addresses(&self) -> Vec<String> {
        self.to.iter().map(|r| r.address.clone()).collect()
    }
}

// The queue payload tolerates two shapes for the originating address: the
// newer `{"from": {"address", "name"}}` form and the flat legacy
// `{"sender", "sender_name"}` form. When both are present the schema form
// wins. Everything else deserializes straightforwardly, so we only need a
// small raw intermediate to resolve that one ambiguity.
#[derive(Deserialize)]
struct RawFrom {
    address: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawEmailEvent {
    message_id: String,
    tenant_id: String,
    #[serde(default)]
    tenant_alias: Option<String>,
    user_id: String,
    received_at: DateTime<Utc>,
    #[serde(default)]
    from: Option<RawFrom>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    sender_name: Option<String>,
    #[serde(default)]
    to: Vec<Recipient>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: EmailBody,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl<'de> Deserialize<'de> for EmailEvent {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawEmailEvent::deserialize(deserializer)?;
        let (sender, sender_name) = match raw.from {
            Some(from) => (from.address, from.name),
            None => (raw.sender.unwrap_or_default(), raw.sender_name),
        };
        Ok(EmailEvent {
            message_id: raw.message_id,
            tenant_id: raw.tenant_id,
            tenant_alias: raw.tenant_alias,
            user_id: raw.user_id,
            received_at: raw.received_at,
            sender,
            sender_name,
            to: raw.to,
            subject: raw.subject,
            body: raw.body,
            headers: raw.headers,
            attachments: raw.attachments,
        })
    }
}
