//! HTTP transport for the search API.
//!
//! [`SearchTransport`] is the seam between the scroll state machine and the
//! network; [`HttpTransport`] is the reqwest implementation.

use crate::config::{Credentials, HttpConfig};
use crate::error::{DataError, Result};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Status and raw body of a search API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Convert a non-success response into an error.
    pub fn into_api_error(self) -> DataError {
        DataError::SearchApi {
            status: self.status,
            body: truncate(self.body, 500),
        }
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

/// Sends JSON requests to the search API.
pub trait SearchTransport: Send + Sync {
    /// POST a JSON body.
    fn post(&self, url: &str, body: &Value)
    -> impl Future<Output = Result<TransportResponse>> + Send;

    /// DELETE with a JSON body, used to release a scroll cursor.
    fn delete(
        &self,
        url: &str,
        body: &Value,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

/// Search transport backed by reqwest with basic authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    credentials: Credentials,
    cleanup_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport with the given credentials and timeouts.
    pub fn new(credentials: Credentials, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.as_str())
            .connect_timeout(http.connect_timeout)
            .timeout(http.read_timeout)
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            credentials,
            cleanup_timeout: http.cleanup_timeout,
        })
    }

    async fn read(response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("credentials", &self.credentials)
            .field("cleanup_timeout", &self.cleanup_timeout)
            .finish_non_exhaustive()
    }
}

impl SearchTransport for HttpTransport {
    async fn post(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn delete(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let response = self
            .client
            .delete(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .timeout(self.cleanup_timeout)
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_status() {
        assert!(TransportResponse::new(200, "{}").is_success());
        assert!(!TransportResponse::new(404, "").is_success());
    }

    #[test]
    fn test_api_error_truncates_body() {
        let body = "x".repeat(2000);
        match TransportResponse::new(500, body).into_api_error() {
            DataError::SearchApi { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 500);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_http_transport_debug_hides_password() {
        let transport =
            HttpTransport::new(Credentials::new("user", "secret"), &HttpConfig::default()).unwrap();
        assert!(!format!("{transport:?}").contains("secret"));
    }
}
