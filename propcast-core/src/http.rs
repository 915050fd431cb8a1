//! HTTP client abstraction for the outbound integrations
//!
//! The mailer, payment and note-taking clients talk to their providers through
//! [`HttpClient`] rather than `reqwest` directly, so tests can substitute a
//! recording implementation and inspect what would have been sent.
//!
//! Responses are returned whatever their status; callers decide what a
//! non-success status means for their provider. Transport failures (DNS,
//! refused connection, timeout) surface as [`Error::Http`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use crate::Error;

/// Status and raw body of a provider response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as JSON, or `{"details": <text>}` when it is not JSON.
    pub fn json_or_details(&self) -> Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|_| serde_json::json!({ "details": self.body }))
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<HttpResponse, Error>;

    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, String)],
        form: &[(String, String)],
    ) -> Result<HttpResponse, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    /// Every request made through this client is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<HttpResponse, Error> {
        let mut request = self.client.post(url).json(body);
        for (key, value) in headers {
            request = request.header(*key, value);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, String)],
        form: &[(String, String)],
    ) -> Result<HttpResponse, Error> {
        let mut request = self.client.post(url).form(form);
        for (key, value) in headers {
            request = request.header(*key, value);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
