//! Send-email action for a host plugin framework.
//!
//! The host calls [`Adapter::execute`] with the stored datasource settings,
//! the user's action fields and any files it has staged. The adapter
//! validates the fields, builds an [`email::Email`], resolves attachments and
//! hands the result to the mail API.

pub mod adapter;
pub mod attachment;
pub mod client;
pub mod config;
pub mod email;
pub mod error;
pub mod fields;

pub use adapter::{Adapter, ExecutionContext, ExecutionOutput};
pub use attachment::StagedFile;
pub use config::DatasourceConfig;
pub use error::{Error, Result};
pub use fields::ActionConfig;
