//! Entry points called by the host plugin framework.

use serde::{Deserialize, Serialize};

use crate::attachment::{self, StagedFile};
use crate::client::{make_client, Transport};
use crate::config::DatasourceConfig;
use crate::email::{parse_addresses, Email};
use crate::error::Result;
use crate::fields::{self, ActionConfig, Field, FIELDS};

/// Host-provided data about the current run.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ExecutionContext {
    pub execution_id: Option<String>,
}

impl ExecutionContext {
    fn id(&self) -> &str {
        self.execution_id.as_deref().unwrap_or("-")
    }
}

/// Result handed back to the host on success.
///
/// `content` is the email that was sent, not the API's receipt.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExecutionOutput {
    pub content: Email,
}

/// What `get_request` renders. Attachment data is left out on purpose.
#[derive(Serialize)]
struct RequestPreview<'a> {
    from: &'a str,
    to: &'a [String],
    cc: &'a [String],
    bcc: &'a [String],
    subject: &'a str,
    html: &'a str,
}

pub struct Adapter {
    schema: &'static [Field],
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter {
    pub fn new() -> Self {
        Self { schema: FIELDS }
    }

    /// Names of the fields a user can configure on this action
    pub fn dynamic_properties(&self) -> Vec<&'static str> {
        self.schema.iter().map(|f| f.name).collect()
    }

    /// Builds the email without touching attachments
    fn base_email(&self, datasource: &DatasourceConfig, action: &ActionConfig) -> Email {
        Email {
            to: parse_addresses(&action.to),
            cc: parse_addresses(&action.cc),
            bcc: parse_addresses(&action.bcc),
            subject: action.subject.clone(),
            html: action.body.clone(),
            ..Email::new()
        }
        .with_sender(datasource.sender())
    }

    /// Validates the action and assembles the full email, attachments
    /// included.
    pub async fn prepare(
        &self,
        datasource: &DatasourceConfig,
        action: &ActionConfig,
        files: &[StagedFile],
    ) -> Result<Email> {
        fields::validate(action, self.schema)?;

        let attachments = attachment::resolve(action.attachments.as_ref(), files).await?;

        Ok(self.base_email(datasource, action).with_attachments(attachments))
    }

    /// Sends a prepared email through `transport`.
    pub async fn deliver<T: Transport + ?Sized>(
        &self,
        transport: &T,
        email: Email,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionOutput> {
        log::info!(
            "[{}] Sending \"{}\" to {} recipients with {} attachments",
            ctx.id(),
            email.subject,
            email.num_recipients(),
            email.attachments.len()
        );

        let receipt = transport.send(&email).await.map_err(|e| {
            log::error!("[{}] Send failed: {}", ctx.id(), e);
            e
        })?;

        log::info!(
            "[{}] Mail accepted, id = {}",
            ctx.id(),
            receipt.id.as_deref().unwrap_or("unknown")
        );

        Ok(ExecutionOutput { content: email })
    }

    /// Validates, builds and sends the email described by `action`.
    ///
    /// Nothing is sent if any step before the send fails.
    pub async fn execute(
        &self,
        datasource: &DatasourceConfig,
        action: &ActionConfig,
        files: &[StagedFile],
        ctx: &ExecutionContext,
    ) -> Result<ExecutionOutput> {
        let email = self.prepare(datasource, action, files).await.map_err(|e| {
            log::error!("[{}] Could not build email: {}", ctx.id(), e);
            e
        })?;

        let client = make_client(datasource)?;

        self.deliver(&client, email, ctx).await
    }

    /// Pretty-printed preview of the request, for display only.
    pub fn get_request(
        &self,
        datasource: &DatasourceConfig,
        action: &ActionConfig,
    ) -> Result<String> {
        let email = self.base_email(datasource, action);

        let preview = RequestPreview {
            from: &email.from,
            to: &email.to,
            cc: &email.cc,
            bcc: &email.bcc,
            subject: &email.subject,
            html: &email.html,
        };

        Ok(serde_json::to_string_pretty(&preview)?)
    }

    /// The mail API exposes no schema to discover
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// No live credential check is performed
    pub fn test(&self, _datasource: &DatasourceConfig) -> Result<()> {
        Ok(())
    }
}
