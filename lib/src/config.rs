use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_PATH: &str = "/etc/emailer/emailer.toml";
const ENV_PREFIX: &str = "EMAILER";

pub const DEFAULT_FROM_NAME: &str = "Notifications";
pub const DEFAULT_FROM_EMAIL: &str = "notifications@resend.dev";
pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// Stored settings for the mail integration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DatasourceConfig {
    pub api_key: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub base_url: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl DatasourceConfig {
    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Default::default()
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.api_key)
    }

    pub fn base_url(&self) -> &str {
        non_blank(&self.base_url).unwrap_or(DEFAULT_BASE_URL)
    }

    /// Sender identity in `Name <address>` form.
    ///
    /// Each half falls back to its default independently.
    pub fn sender(&self) -> String {
        let name = non_blank(&self.from_name).unwrap_or(DEFAULT_FROM_NAME);
        let email = non_blank(&self.from_email).unwrap_or(DEFAULT_FROM_EMAIL);

        format!("{} <{}>", name, email)
    }
}

/// Loads datasource settings from the filesystem and merges them with any
/// environment variables prefixed with `EMAILER_`.
///
/// The file is optional; environment variables take precedence.
pub fn load(path: Option<&str>) -> Result<DatasourceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path.unwrap_or(DEFAULT_PATH)).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()?;

    Ok(settings.try_deserialize::<DatasourceConfig>()?)
}
