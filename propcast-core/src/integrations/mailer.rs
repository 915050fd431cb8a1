// File: propcast-core/src/integrations/mailer.rs

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

use crate::http::HttpClient;
use crate::integrations::templates::strip_tags;

/// Best-effort delivery. Implementations log failures and return `false`
/// instead of erroring; no caller treats a failed mail as fatal.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html: &str) -> bool;
}

/// Posts `{from, to, subject, html, text}` to a transactional mail API.
pub struct HttpMailer {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(http: Arc<dyn HttpClient>, endpoint: &str, api_key: &str, from: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, html: &str) -> bool {
        let body = json!({
            "from": self.from,
            "to": [recipient],
            "subject": subject,
            "html": html,
            "text": strip_tags(html),
        });
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];

        match self.http.post_json(&self.endpoint, &headers, &body).await {
            Ok(resp) if resp.is_success() => {
                info!("Mail '{}' sent to {}", subject, recipient);
                true
            }
            Ok(resp) => {
                warn!(
                    "Mail API rejected '{}' for {}: status={} body={}",
                    subject, recipient, resp.status, resp.body
                );
                false
            }
            Err(e) => {
                error!("Failed to send mail '{}' to {}: {:?}", subject, recipient, e);
                false
            }
        }
    }
}

/// Used when no mail API is configured: records what would have been sent.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, html: &str) -> bool {
        info!(
            "(mail disabled) to={} subject='{}' bytes={}",
            recipient,
            subject,
            html.len()
        );
        true
    }
}
