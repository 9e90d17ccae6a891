use std::future::Future;
use std::pin::Pin;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::DatasourceConfig;
use crate::email::Email;
use crate::error::{Error, Result};

const SEND_ENDPOINT: &str = "emails";

pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Delivery acknowledgment returned by the mail API.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Receipt {
    #[serde(default)]
    pub id: Option<String>,
}

/// Anything that can deliver an `Email`.
pub trait Transport {
    fn send<'a>(&'a self, email: &'a Email) -> ClientFuture<'a, Receipt>;
}

/// HTTP client for the mail API, bound to a single API key.
pub struct MailClient {
    api_key: String,
    endpoint: url::Url,
    client: reqwest::Client,
}

impl MailClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        // Without the trailing slash `join` would replace the last segment
        let mut base = url::Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: base.join(SEND_ENDPOINT)?,
            client: reqwest::Client::new(),
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    async fn request(&self, email: &Email) -> Result<Receipt> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(email)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Transport(format!(
                "mail API returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        // Some deployments answer 202 with an empty body
        if body.trim().is_empty() {
            return Ok(Receipt::default());
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Transport(format!("unexpected mail API response: {}", e)))
    }
}

impl Transport for MailClient {
    fn send<'a>(&'a self, email: &'a Email) -> ClientFuture<'a, Receipt> {
        Box::pin(self.request(email))
    }
}

/// Builds a client for this invocation's credentials.
///
/// Each invocation gets its own client, so concurrent sends with different
/// keys never share state.
pub fn make_client(config: &DatasourceConfig) -> Result<MailClient> {
    let api_key = config
        .api_key()
        .ok_or_else(|| Error::NotFound("API key credentials".to_string()))?;

    MailClient::new(api_key, config.base_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key() {
        let result = make_client(&DatasourceConfig::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn endpoint_default() {
        let client = make_client(&DatasourceConfig::with_api_key("re_123")).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://api.resend.com/emails");
    }

    #[test]
    fn endpoint_with_path() {
        let config = DatasourceConfig {
            base_url: Some("http://127.0.0.1:8025/v2".to_string()),
            ..DatasourceConfig::with_api_key("re_123")
        };
        let client = make_client(&config).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:8025/v2/emails");
    }

    #[test]
    fn bad_base_url() {
        let config = DatasourceConfig {
            base_url: Some("not a url".to_string()),
            ..DatasourceConfig::with_api_key("re_123")
        };
        assert!(matches!(make_client(&config), Err(Error::Config(_))));
    }

    /// Accepts one connection, records the raw request and answers with
    /// `status` and `body`.
    async fn stub_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            let l = l.to_ascii_lowercase();
                            l.strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let resp = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(resp.as_bytes()).await.unwrap();

            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn send_posts_json() {
        let (base, handle) = stub_server("200 OK", r#"{"id": "49a3999c"}"#).await;
        let client = MailClient::new("re_123", &base).unwrap();

        let email = Email {
            from: "Acme <a@acme.io>".to_string(),
            to: vec!["b@x.com".to_string()],
            subject: "Hi".to_string(),
            html: "<p>Hello</p>".to_string(),
            ..Default::default()
        };

        let receipt = client.send(&email).await.unwrap();
        assert_eq!(receipt.id.as_deref(), Some("49a3999c"));

        let request = handle.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /emails HTTP/1.1"));
        assert!(lower.contains("authorization: bearer re_123"));

        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let sent: Email = serde_json::from_str(body).unwrap();
        assert_eq!(sent, email);
    }

    #[tokio::test]
    async fn rejected_send() {
        let (base, handle) = stub_server("422 Unprocessable Entity", r#"{"message": "bad from"}"#).await;
        let client = MailClient::new("re_123", &base).unwrap();

        match client.send(&Email::new()).await {
            Err(Error::Transport(msg)) => {
                assert!(msg.contains("422"));
                assert!(msg.contains("bad from"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_api() {
        // Nothing listens on the discard port
        let client = MailClient::new("re_123", "http://127.0.0.1:9").unwrap();
        let result = client.send(&Email::new()).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
