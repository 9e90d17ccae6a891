use serde::{Deserialize, Serialize};

/// Normalized email, as sent to the mail API.
///
/// This is also what a successful execution returns to the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A resolved attachment. `content` holds base64 data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
    pub content_type: String,
}

impl Email {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_sender(mut self, sender: String) -> Self {
        self.from = sender;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn num_recipients(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

/// Splits a comma-separated address list.
///
/// Entries are trimmed and empty ones dropped. Addresses are not validated;
/// the mail API decides what it accepts.
pub fn parse_addresses(addresses: &str) -> Vec<String> {
    addresses
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}
