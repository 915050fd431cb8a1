use std::sync::Arc;

use propcast_core::http::HttpClient;
use serde_json::{json, Value};
use thiserror::Error as ThisError;
use tracing::{error, info};

use crate::models::ProviderConfig;

#[derive(Debug, ThisError)]
pub enum AiError {
    #[error("{0}")]
    Config(String),

    /// Non-2xx answer; `body` is the provider's JSON or `{"details": text}`.
    #[error("provider returned {status}: {body}")]
    Upstream { status: u16, body: Value },

    #[error("provider unreachable: {0}")]
    Transport(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Chat completion client for an OpenAI-compatible provider.
#[derive(Clone)]
pub struct CompletionClient {
    config: ProviderConfig,
    http: Arc<dyn HttpClient>,
}

impl CompletionClient {
    pub fn new(config: ProviderConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Posts `{model, messages}` and returns the provider's JSON unchanged.
    pub async fn chat(&self, model: Option<&str>, messages: &Value) -> Result<Value, AiError> {
        if self.config.api_key.is_empty() {
            return Err(AiError::Config("API key not configured.".into()));
        }
        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_model);
        let payload = json!({ "model": model, "messages": messages });
        let headers = [
            ("Authorization", format!("Bearer {}", self.config.api_key)),
            ("accept", "application/json".to_string()),
        ];

        info!("chat completion request: model={}", model);
        let resp = self
            .http
            .post_json(&self.config.completions_url(), &headers, &payload)
            .await
            .map_err(|e| {
                error!("chat completion transport error: {}", e);
                AiError::Transport(e.to_string())
            })?;

        if !resp.is_success() {
            error!("chat completion failed: status={} body={}", resp.status, resp.body);
            return Err(AiError::Upstream {
                status: resp.status,
                body: resp.json_or_details(),
            });
        }

        serde_json::from_str(&resp.body).map_err(|e| {
            error!("chat completion returned non-JSON body: {}", e);
            AiError::InvalidResponse(e.to_string())
        })
    }

    /// `choices[0].message.content`, trimmed; `None` when absent or blank.
    pub fn first_choice(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propcast_core::test_utils::memory::RecordingHttpClient;

    fn client(http: Arc<RecordingHttpClient>, key: &str) -> CompletionClient {
        CompletionClient::new(ProviderConfig::new(key), http)
    }

    #[tokio::test]
    async fn test_chat_posts_model_and_bearer() -> Result<(), AiError> {
        let http = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"choices":[{"message":{"content":"  hi  "}}]}"#,
        ));
        let c = client(http.clone(), "pplx-key");
        let messages = json!([{ "role": "user", "content": "hello" }]);

        let resp = c.chat(None, &messages).await?;
        assert_eq!(CompletionClient::first_choice(&resp).as_deref(), Some("hi"));

        let calls = http.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://api.perplexity.ai/chat/completions");
        assert_eq!(calls[0].header("authorization").as_deref(), Some("Bearer pplx-key"));
        assert_eq!(calls[0].json["model"], "sonar");
        assert_eq!(calls[0].json["messages"], messages);

        c.chat(Some("sonar-pro"), &messages).await?;
        assert_eq!(http.calls()[1].json["model"], "sonar-pro");
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_relays_upstream_errors() -> Result<(), AiError> {
        let http = Arc::new(RecordingHttpClient::responding(429, r#"{"error":"rate limited"}"#));
        http.push_response(502, "Bad Gateway");
        let c = client(http, "k");

        match c.chat(None, &json!([])).await {
            Err(AiError::Upstream { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, json!({ "details": "Bad Gateway" }));
            }
            other => panic!("unexpected {other:?}"),
        }
        match c.chat(None, &json!([])).await {
            Err(AiError::Upstream { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body["error"], "rate limited");
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_config_and_transport_failures() -> Result<(), AiError> {
        let http = Arc::new(RecordingHttpClient::unreachable());
        assert!(matches!(
            client(http.clone(), "").chat(None, &json!([])).await,
            Err(AiError::Config(_))
        ));
        assert!(http.calls().is_empty());

        assert!(matches!(
            client(http, "k").chat(None, &json!([])).await,
            Err(AiError::Transport(_))
        ));
        Ok(())
    }

    #[test]
    fn test_first_choice_handles_missing_and_blank() {
        assert!(CompletionClient::first_choice(&json!({})).is_none());
        assert!(CompletionClient::first_choice(&json!({ "choices": [] })).is_none());
        assert!(CompletionClient::first_choice(
            &json!({ "choices": [{ "message": { "content": "   " } }] })
        )
        .is_none());
    }
}
