use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::email::Attachment;
use crate::error::{Error, Result};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Characters that may follow an attachment id in a staged filename.
const ID_SEPARATORS: &[char] = &['.', '_', '-'];

/// A file the host has already placed on local storage for this invocation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StagedFile {
    pub filename: String,
    pub path: PathBuf,
}

/// One entry of the user's attachment list.
#[derive(Clone, Debug, PartialEq)]
pub enum Descriptor {
    /// Reference to a staged file, by id
    Staged {
        id: String,
        name: Option<String>,
        content_type: Option<String>,
    },
    /// Content provided directly in the action
    Inline {
        name: String,
        contents: String,
        content_type: String,
    },
}

#[derive(Deserialize)]
struct StagedRef {
    id: String,
    name: Option<String>,
    #[serde(rename = "type")]
    content_type: Option<String>,
}

#[derive(Deserialize)]
struct InlineContent {
    name: String,
    contents: String,
    #[serde(rename = "type")]
    content_type: String,
}

/// Staged filenames are either the bare id or the id followed by a
/// separator (`<id>.pdf`, `<id>_report.pdf`, `<id>-report.pdf`).
fn matches_id(id: &str, filename: &str) -> bool {
    if id.is_empty() {
        return false;
    }

    match filename.strip_prefix(id) {
        Some(rest) => rest.is_empty() || rest.starts_with(ID_SEPARATORS),
        None => false,
    }
}

impl Descriptor {
    /// Classifies a raw JSON entry. `index` is only used for error messages.
    pub fn from_value(index: usize, value: Value) -> Result<Self> {
        let (has_id, has_contents) = match value.as_object() {
            Some(obj) => (obj.contains_key("id"), obj.contains_key("contents")),
            None => {
                return Err(Error::Format(format!(
                    "attachment #{} is not an object",
                    index
                )))
            }
        };

        let invalid = |e: serde_json::Error| {
            Error::Format(format!("attachment #{} is invalid: {}", index, e))
        };

        match (has_id, has_contents) {
            (true, false) => {
                let r: StagedRef = serde_json::from_value(value).map_err(invalid)?;
                if r.id.trim().is_empty() {
                    return Err(Error::Format(format!("attachment #{} has an empty id", index)));
                }
                Ok(Descriptor::Staged {
                    id: r.id,
                    name: r.name,
                    content_type: r.content_type,
                })
            }
            (false, true) => {
                let c: InlineContent = serde_json::from_value(value).map_err(invalid)?;
                Ok(Descriptor::Inline {
                    name: c.name,
                    contents: c.contents,
                    content_type: c.content_type,
                })
            }
            _ => Err(Error::Format(format!(
                "attachment #{} must be either a file reference or inline content",
                index
            ))),
        }
    }

    /// Name used when reporting on this attachment
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Staged { id, name, .. } => name.as_deref().unwrap_or(id),
            Descriptor::Inline { name, .. } => name,
        }
    }

    /// Produces the base64-encoded attachment.
    ///
    /// Staged references are read from `files`; inline content is encoded
    /// as is.
    pub async fn resolve(&self, files: &[StagedFile]) -> Result<Attachment> {
        match self {
            Descriptor::Inline {
                name,
                contents,
                content_type,
            } => Ok(Attachment {
                filename: name.clone(),
                content: BASE64.encode(contents),
                content_type: content_type.clone(),
            }),
            Descriptor::Staged {
                id,
                name,
                content_type,
            } => {
                let file = files
                    .iter()
                    .find(|f| matches_id(id, &f.filename))
                    .ok_or_else(|| Error::NotFound(format!("attachment {}", self.name())))?;

                log::debug!("Reading attachment {} from {}", self.name(), file.path.display());

                let data = tokio::fs::read(&file.path).await.map_err(|e| {
                    log::error!("Failed to read {}: {}", file.path.display(), e);
                    Error::Retrieval(format!("could not read attachment {}: {}", self.name(), e))
                })?;

                Ok(Attachment {
                    filename: name.clone().unwrap_or_else(|| file.filename.clone()),
                    content: BASE64.encode(&data),
                    content_type: content_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                })
            }
        }
    }
}

/// Turns the raw `attachments` field into descriptors.
///
/// The list may arrive as a JSON array or as a string containing one.
/// A missing list or `null` means no attachments.
pub fn parse(raw: Option<&Value>) -> Result<Vec<Descriptor>> {
    let list = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s).map_err(|e| {
            Error::Format(format!("attachments are not valid JSON: {}", e))
        })?,
        Some(v) => v.clone(),
    };

    match list {
        Value::Array(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(i, v)| Descriptor::from_value(i, v))
            .collect(),
        _ => Err(Error::Format("attachments must be a JSON array".to_string())),
    }
}

/// Parses and resolves all attachments, concurrently.
///
/// The output keeps descriptor order. Any failure fails the whole batch.
pub async fn resolve(raw: Option<&Value>, files: &[StagedFile]) -> Result<Vec<Attachment>> {
    let descriptors = parse(raw)?;

    if !descriptors.is_empty() {
        log::debug!("Resolving {} attachments", descriptors.len());
    }

    try_join_all(descriptors.iter().map(|d| d.resolve(files))).await
}
