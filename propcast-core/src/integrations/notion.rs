// File: propcast-core/src/integrations/notion.rs

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::http::HttpClient;
use crate::Error;

pub const NOTION_PAGES_URL: &str = "https://api.notion.com/v1/pages";
pub const NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_PAGE_TITLE: &str = "Perplexity Result";

/// Exports AI output as pages in one Notion database.
#[derive(Clone)]
pub struct NotionClient {
    http: Arc<dyn HttpClient>,
    api_key: String,
    database_id: String,
    pages_url: String,
}

impl NotionClient {
    pub fn new(http: Arc<dyn HttpClient>, api_key: &str, database_id: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            database_id: database_id.to_string(),
            pages_url: NOTION_PAGES_URL.to_string(),
        }
    }

    pub fn page_payload(&self, title: &str, content: &str) -> Value {
        json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Name": {
                    "title": [ { "text": { "content": title } } ]
                }
            },
            "children": [
                {
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": {
                        "rich_text": [ { "type": "text", "text": { "content": content } } ]
                    }
                }
            ]
        })
    }

    /// Creates a page from an AI result. `title` and `content` keys are used
    /// when present; otherwise the whole result becomes the page text.
    pub async fn export(&self, result: &Value) -> Result<Value, Error> {
        if self.api_key.is_empty() {
            return Err(Error::Config("Notion API key not configured.".into()));
        }
        if self.database_id.is_empty() {
            return Err(Error::Config("Notion database ID not configured.".into()));
        }
        if result.is_null() || result.as_object().is_some_and(|o| o.is_empty()) {
            return Err(Error::Validation("No Perplexity data provided.".into()));
        }

        let title = result["title"].as_str().unwrap_or(DEFAULT_PAGE_TITLE);
        let content = match result["content"].as_str() {
            Some(c) => c.to_string(),
            None => result.to_string(),
        };

        let headers = [
            ("Authorization", format!("Bearer {}", self.api_key)),
            ("Notion-Version", NOTION_VERSION.to_string()),
        ];
        let resp = self
            .http
            .post_json(&self.pages_url, &headers, &self.page_payload(title, &content))
            .await?;
        let body = resp.json_or_details();

        if resp.is_success() {
            info!("Created Notion page '{}'", title);
            Ok(body)
        } else {
            warn!("Notion rejected page '{}' with status {}", title, resp.status);
            Err(Error::Upstream { status: resp.status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory::RecordingHttpClient;

    #[tokio::test]
    async fn export_builds_page_in_database() -> Result<(), Error> {
        let http = Arc::new(RecordingHttpClient::responding(200, r#"{"object":"page","id":"p1"}"#));
        let notion = NotionClient::new(http.clone(), "secret", "db-42");

        let page = notion
            .export(&json!({ "title": "1 Elm St", "content": "Great house" }))
            .await?;
        assert_eq!(page["id"], "p1");

        let call = &http.calls()[0];
        assert_eq!(call.url, NOTION_PAGES_URL);
        assert_eq!(call.header("Notion-Version").as_deref(), Some(NOTION_VERSION));
        assert_eq!(call.json["parent"]["database_id"], "db-42");
        assert_eq!(call.json["properties"]["Name"]["title"][0]["text"]["content"], "1 Elm St");
        assert_eq!(
            call.json["children"][0]["paragraph"]["rich_text"][0]["text"]["content"],
            "Great house"
        );
        Ok(())
    }

    #[tokio::test]
    async fn upstream_error_is_relayed() {
        let http = Arc::new(RecordingHttpClient::responding(400, "not json"));
        let notion = NotionClient::new(http, "secret", "db");
        let err = notion.export(&json!({ "content": "x" })).await.unwrap_err();
        match err {
            Error::Upstream { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body["details"], "not json");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_configuration() {
        let http = Arc::new(RecordingHttpClient::responding(200, "{}"));
        let notion = NotionClient::new(http.clone(), "", "db");
        assert!(matches!(notion.export(&json!({"a": 1})).await, Err(Error::Config(_))));
        assert!(http.calls().is_empty());
    }
}
