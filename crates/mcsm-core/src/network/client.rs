//! HTTP client shared by remote resources and catalogs.
//!
//! A thin wrapper around reqwest with:
//! - A default request timeout and user agent
//! - Non-2xx responses turned into [`McsmError::RemoteFetch`]

use crate::config::NetworkConfig;
use crate::{McsmError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP client with mcsm defaults. Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a new HTTP client with a custom default timeout.
    ///
    /// The timeout bounds connecting and waiting for response headers; body
    /// streaming is not capped so large transfers can run to completion.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| McsmError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Get a reference to the underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Make a GET request. Fails on any non-2xx status.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.get_with_headers(url, &[]).await
    }

    /// Make a GET request with custom headers. Fails on any non-2xx status.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Response> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| McsmError::Network {
            message: format!("GET {} failed: {}", url, e),
            source: Some(e),
        })?;

        debug!("GET {} -> {}", url, response.status());
        Self::check_response_status(response, url)
    }

    /// GET a URL and deserialize its JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| McsmError::Network {
            message: format!("Failed to read body of {}: {}", url, e),
            source: Some(e),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| McsmError::Json {
            message: format!("Invalid JSON from {}: {}", url, e),
            source: Some(e),
        })
    }

    fn check_response_status(response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(McsmError::RemoteFetch {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

/// Extract the host from a URL, for log messages.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://launchermeta.mojang.com/mc/game/version_manifest.json"),
            "launchermeta.mojang.com"
        );
        assert_eq!(extract_domain("invalid-url"), "unknown");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.default_timeout(), NetworkConfig::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let url = format!("{}/missing", server.uri());
        match client.get(&url).await.unwrap_err() {
            McsmError::RemoteFetch { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let url = format!("{}/auth", server.uri());
        let response = client
            .get_with_headers(&url, &[("x-api-key".into(), "secret".into())])
            .await
            .unwrap();
        assert!(response.status().is_success());

        // Without the header the mock does not match and wiremock answers 404.
        let err = client.get_json::<serde_json::Value>(&url).await.unwrap_err();
        assert!(matches!(err, McsmError::RemoteFetch { status: 404, .. }));
    }
}
