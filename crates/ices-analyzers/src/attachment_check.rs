use async_trait::async_trait;
use base64::Engine;
use ices_core::{Analyzer, Attachment, EmailEvent, Observation, Result};
use sha2::{Digest, Sha256};

const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "scr", "bat", "cmd", "com", "pif", "vbs", "vbe", "js", "jse", "wsf", "wsh", "ps1", "jar", "msi", "hta", "cpl", "dll", "docm", "xlsm", "pptm",
    "dotm", "xltm", "iso", "img", "vhd", "reg", "lnk", "gadget",
];

const DOUBLE_EXTENSION_TRAPS: &[&str] = &["exe", "scr", "bat", "cmd", "com", "pif", "vbs"];

const PASSWORD_PROTECTED_MARKERS: &[&str] = &["password-protected", "encrypted"];

const SMALL_EXECUTABLE_MAX_BYTES: u64 = 50_000;

fn extension_of(name: &str) -> Option<String> {
    name.rsplit('.').next().map(str::to_ascii_lowercase).filter(|ext| ext.len() != name.len())
}

/// A "double extension" (`invoice.pdf.exe`) is one of the cheapest and most
/// reliable phishing tells — the visible name looks benign while the OS
/// executes the real, hidden extension. Only checked when at least two dots
/// are present, so a plain `report.exe` is caught by the dangerous-extension
/// check instead.
fn has_double_extension(name: &str) -> bool {
    name.matches('.').count() >= 2 && extension_of(name).is_some_and(|ext| DOUBLE_EXTENSION_TRAPS.contains(&ext.as_str()))
}

fn is_password_protected(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    PASSWORD_PROTECTED_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn is_small_executable(name: &str, size: u64) -> bool {
    size < SMALL_EXECUTABLE_MAX_BYTES && extension_of(name).is_some_and(|ext| DANGEROUS_EXTENSIONS.contains(&ext.as_str()))
}

fn sha256_hex(attachment: &Attachment) -> Option<String> {
    if attachment.content_bytes.is_empty() {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(&attachment.content_bytes).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

pub struct AttachmentCheckAnalyzer;

#[async_trait]
impl Analyzer for AttachmentCheckAnalyzer {
    fn name(&self) -> &str {
        "attachment_check"
    }

    fn order(&self) -> i32 {
        30
    }

    async fn observe(&self, event: &EmailEvent) -> Result<Vec<Observation>> {
        let attachments = &event.attachments;

        let has_dangerous_attachment = attachments
            .iter()
            .any(|a| extension_of(&a.name).is_some_and(|ext| DANGEROUS_EXTENSIONS.contains(&ext.as_str())));
        let has_double_extension = attachments.iter().any(|a| has_double_extension(&a.name));
        let has_password_protected = attachments.iter().any(|a| is_password_protected(&a.content_type));
        let has_small_executable = attachments.iter().any(|a| is_small_executable(&a.name, a.size));
        let attachment_hashes = attachments.iter().filter_map(sha256_hex).collect::<Vec<_>>().join(",");

        Ok(vec![
            Observation::numeric("attachment_count", attachments.len() as f64),
            Observation::boolean("has_dangerous_attachment", has_dangerous_attachment),
            Observation::boolean("has_double_extension", has_double_extension),
            Observation::boolean("has_password_protected", has_password_protected),
            Observation::boolean("has_small_executable", has_small_executable),
            Observation::text("attachment_hashes", attachment_hashes),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_event;

    fn attachment(name: &str, content_type: &str, size: u64, content_bytes: &str) -> Attachment {
        Attachment { name: name.to_string(), content_type: content_type.to_string(), size, content_bytes: content_bytes.to_string() }
    }

    #[tokio::test]
    async fn flags_dangerous_extension() {
        let mut event = sample_event();
        event.attachments = vec![attachment("setup.exe", "application/x-msdownload", 1024, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(
            results.iter().find(|o| o.key == "has_dangerous_attachment").unwrap().value.as_bool(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn flags_double_extension_disguise() {
        let mut event = sample_event();
        event.attachments = vec![attachment("invoice.pdf.exe", "application/octet-stream", 2048, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(
            results.iter().find(|o| o.key == "has_double_extension").unwrap().value.as_bool(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn benign_pdf_is_not_flagged() {
        let mut event = sample_event();
        event.attachments = vec![attachment("report.pdf", "application/pdf", 4096, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(
            results.iter().find(|o| o.key == "has_dangerous_attachment").unwrap().value.as_bool(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn flags_small_executable_under_the_size_threshold() {
        let mut event = sample_event();
        event.attachments = vec![attachment("update.exe", "application/x-msdownload", 1024, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(
            results.iter().find(|o| o.key == "has_small_executable").unwrap().value.as_bool(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn does_not_flag_a_large_executable_as_small() {
        let mut event = sample_event();
        event.attachments = vec![attachment("installer.exe", "application/x-msdownload", 500_000, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(
            results.iter().find(|o| o.key == "has_small_executable").unwrap().value.as_bool(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn flags_password_protected_content_type() {
        let mut event = sample_event();
        event.attachments = vec![attachment("secret.zip", "application/x-password-protected", 2048, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(
            results.iter().find(|o| o.key == "has_password_protected").unwrap().value.as_bool(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn computes_sha256_for_decoded_content() {
        let mut event = sample_event();
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"hello world");
        event.attachments = vec![attachment("note.txt", "text/plain", 11, &encoded)];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        let hashes = results.iter().find(|o| o.key == "attachment_hashes").unwrap();
        assert_eq!(hashes.value.display_string(), "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde");
    }

    #[tokio::test]
    async fn attachment_hashes_is_empty_when_no_content_bytes_present() {
        let mut event = sample_event();
        event.attachments = vec![attachment("report.pdf", "application/pdf", 4096, "")];
        let results = AttachmentCheckAnalyzer.observe(&event).await.unwrap();
        assert_eq!(results.iter().find(|o| o.key == "attachment_hashes").unwrap().value.display_string(), "");
    }
}
