//! HTTP client utilities.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScholarConfig;
use crate::sources::{PageSource, SourceError};

/// Shared HTTP client that presents itself like a desktop browser
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client from the search engine settings
    pub fn from_config(config: &ScholarConfig) -> Result<Self, SourceError> {
        Self::with_user_agent(&config.user_agent, Duration::from_secs(config.timeout_secs))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        tracing::debug!(url, "GET");

        let response = self.client.get(url).send().await.map_err(|e| {
            SourceError::Network(format!("Connection can't be established to {}: {}", url, e))
        })?;

        // Redirects are followed by the client; anything left that is not a success is fatal
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "{} returned status {}",
                url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response from {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::with_user_agent("citegraph-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><div class=\"gs_r\"></div></html>")
            .create_async()
            .await;

        let url = format!("{}/scholar?q=plasma&num=10", server.url());
        let body = client().fetch(&url).await.unwrap();

        assert!(body.contains("gs_r"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_names_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scholar")
            .with_status(503)
            .create_async()
            .await;

        let url = format!("{}/scholar", server.url());
        let err = client().fetch(&url).await.unwrap_err();

        match err {
            SourceError::Api(message) => {
                assert!(message.contains(&url));
                assert!(message.contains("503"));
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let err = client().fetch("http://127.0.0.1:1/scholar").await.unwrap_err();
        assert!(matches!(err, SourceError::Network(_)));
    }
}
