use std::error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// All possible adapter errors.
///
/// Every variant carries a message that is shown to the user verbatim by
/// the host, so messages should name the offending field or attachment.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Error {
    /// A required field was left empty. Holds the field label.
    Validation(String),
    /// The attachment list (or one of its entries) is malformed.
    Format(String),
    /// Credentials or a referenced attachment could not be found.
    NotFound(String),
    /// A matched attachment could not be read.
    Retrieval(String),
    /// The mail API rejected the request or could not be reached.
    Transport(String),
    /// Datasource settings could not be loaded.
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Validation(ref label) => write!(f, "Validation: {} is required", label),
            Error::Format(ref msg) => write!(f, "Format: {}", msg),
            Error::NotFound(ref what) => write!(f, "NotFound: {} not found", what),
            Error::Retrieval(ref msg) => write!(f, "Retrieval: {}", msg),
            Error::Transport(ref msg) => write!(f, "Transport: {}", msg),
            Error::Config(ref msg) => write!(f, "Config: {}", msg),
        }
    }
}

impl error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid base URL: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = Error::Validation("Subject".to_string());
        assert_eq!(err.to_string(), "Validation: Subject is required");
    }

    #[test]
    fn not_found_display() {
        let err = Error::NotFound("attachment report.pdf".to_string());
        assert_eq!(err.to_string(), "NotFound: attachment report.pdf not found");
    }

    #[tokio::test]
    async fn timeout_keeps_the_cause() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });

        let err = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(100))
            .build()
            .unwrap()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let cause = err.to_string();
        match Error::from(err) {
            Error::Transport(msg) => {
                assert!(msg.starts_with("request timed out: "));
                assert!(msg.ends_with(&cause));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn json_errors_are_format_errors() {
        let err: Error = serde_json::from_str::<serde_json::Value>("[1,").unwrap_err().into();
        assert!(matches!(err, Error::Format(_)));
    }
}
