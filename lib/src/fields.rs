//! User-facing fields of the send-email action and their validation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters entered by the user for a single send.
///
/// Address fields are comma-separated lists. `attachments` is either a JSON
/// array or a string containing one.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionConfig {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
    pub attachments: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
}

/// Configurable fields, in the order they are shown and validated.
pub static FIELDS: &[Field] = &[
    Field { name: "to", label: "To", required: true },
    Field { name: "cc", label: "CC", required: false },
    Field { name: "bcc", label: "BCC", required: false },
    Field { name: "subject", label: "Subject", required: true },
    Field { name: "body", label: "Body", required: true },
    Field { name: "attachments", label: "Attachments", required: false },
];

impl ActionConfig {
    fn is_empty(&self, name: &str) -> bool {
        match name {
            "to" => self.to.trim().is_empty(),
            "cc" => self.cc.trim().is_empty(),
            "bcc" => self.bcc.trim().is_empty(),
            "subject" => self.subject.trim().is_empty(),
            "body" => self.body.trim().is_empty(),
            "attachments" => match self.attachments {
                None | Some(serde_json::Value::Null) => true,
                Some(serde_json::Value::String(ref s)) => s.trim().is_empty(),
                Some(serde_json::Value::Array(ref a)) => a.is_empty(),
                Some(_) => false,
            },
            // Unknown names can never be filled in
            _ => true,
        }
    }
}

/// Fails on the first required field that is empty, in schema order.
pub fn validate(action: &ActionConfig, schema: &[Field]) -> Result<()> {
    match schema.iter().find(|f| f.required && action.is_empty(f.name)) {
        Some(field) => Err(Error::Validation(field.label.to_string())),
        None => Ok(()),
    }
}
