//! Bundled catalog of sending domains for common SaaS notification senders
//! (e-signature, file-share, identity, collaboration). Deployments can layer
//! tenant-specific additions on top via configuration; this list only covers
//! the defaults shipped with the crate. Looked up once per worker and held
//! for the process lifetime rather than reloaded per message.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaasProvider {
    pub name: &'static str,
}

const KNOWN_VENDORS: &[(&str, &str)] = &[
    ("docusign.net", "DocuSign"),
    ("docusign.com", "DocuSign"),
    ("adobesign.com", "Adobe Sign"),
    ("echosign.com", "Adobe Sign"),
    ("dropbox.com", "Dropbox"),
    ("dropboxmail.com", "Dropbox"),
    ("sharepointonline.com", "SharePoint"),
    ("sharepoint.com", "SharePoint"),
    ("onedrive.com", "OneDrive"),
    ("box.com", "Box"),
    ("okta.com", "Okta"),
    ("oktapreview.com", "Okta"),
    ("zoom.us", "Zoom"),
    ("slack.com", "Slack"),
    ("notion.so", "Notion"),
    ("asana.com", "Asana"),
    ("atlassian.com", "Atlassian"),
    ("trello.com", "Trello"),
    ("hellosign.com", "HelloSign"),
    ("pandadoc.com", "PandaDoc"),
    ("workday.com", "Workday"),
    ("concursolutions.com", "Concur"),
    ("expensify.com", "Expensify"),
    ("quickbooks.com", "QuickBooks"),
    ("intuit.com", "Intuit"),
    ("bill.com", "Bill.com"),
];

fn index() -> &'static HashMap<&'static str, &'static str> {
    static INDEX: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| KNOWN_VENDORS.iter().copied().collect())
}

/// Longest-suffix match over the dot-labels of `domain`: `notify.eu.docusign.net`
/// matches a catalog entry for `docusign.net` by trying the full domain first,
/// then each shorter label-suffix, so a more specific catalog entry (were one
/// ever added for `notify.docusign.net`) always wins over a broader parent.
#[must_use]
pub fn lookup(domain: &str) -> Option<SaasProvider> {
    let domain = domain.to_ascii_lowercase();
    let labels: Vec<&str> = domain.split('.').collect();
    let catalog = index();

    (0..labels.len()).find_map(|start| {
        let suffix = labels[start..].join(".");
        catalog.get(suffix.as_str()).map(|name| SaasProvider { name })
    })
}
