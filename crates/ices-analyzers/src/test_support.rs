#![cfg(test)]

use std::collections::HashMap;

use chrono::Utc;
use ices_core::{Attachment, BodyContentType, EmailBody, EmailEvent, Recipient};

pub fn sample_event() -> EmailEvent {
    EmailEvent {
        message_id: "msg-1".to_string(),
        tenant_id: "tenant-1".to_string(),
        tenant_alias: None,
        user_id: "user-1".to_string(),
        received_at: Utc::now(),
        sender: "alice@example.com".to_string(),
        sender_name: Some("Alice".to_string()),
        to: vec![Recipient { address: "bob@example.com".to_string(), name: String::new() }],
        subject: "Hello".to_string(),
        body: EmailBody { content_type: BodyContentType::Text, content: "Hi Bob".to_string() },
        headers: HashMap::new(),
        attachments: Vec::<Attachment>::new(),
    }
}
