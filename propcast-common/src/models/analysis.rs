// File: propcast-common/src/models/analysis.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_PACKAGE: &str = "Professional";
pub const DEFAULT_MODEL: &str = "sonar";
const SHORT_ADDRESS_LEN: usize = 50;

/// A generated property analysis owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Analysis {
    pub analysis_id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub package_name: String,
    pub analysis_content: String,
    pub analysis_model: String,
    pub api_response: Value,
    pub agent_description: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for saving a freshly generated analysis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAnalysis {
    pub address: Option<String>,
    pub package_name: Option<String>,
    pub analysis_content: Option<String>,
    pub analysis_model: Option<String>,
    pub api_response: Option<Value>,
    pub agent_description: Option<String>,
    pub payment_intent_id: Option<String>,
}

impl Analysis {
    pub fn new(user_id: Uuid, address: &str, content: &str) -> Self {
        let now = Utc::now();
        Self {
            analysis_id: Uuid::new_v4(),
            user_id,
            address: address.to_string(),
            package_name: DEFAULT_PACKAGE.to_string(),
            analysis_content: content.to_string(),
            analysis_model: DEFAULT_MODEL.to_string(),
            api_response: Value::Object(Default::default()),
            agent_description: None,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The address cut to 50 characters, with `...` appended when cut.
    pub fn short_address(&self) -> String {
        if self.address.chars().count() > SHORT_ADDRESS_LEN {
            let head: String = self.address.chars().take(SHORT_ADDRESS_LEN).collect();
            format!("{head}...")
        } else {
            self.address.clone()
        }
    }

    /// The payment reference, preferring the dedicated column over the copy
    /// some clients embed in the raw AI response.
    pub fn payment_reference(&self) -> Option<String> {
        self.payment_intent_id.clone().or_else(|| {
            self.api_response
                .get("payment_intent_id")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    }

    pub fn payment_status(&self) -> &'static str {
        if self.analysis_content.is_empty() {
            "pending"
        } else {
            "completed"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_address_truncates_on_char_boundary() {
        let mut a = Analysis::new(Uuid::new_v4(), "123 Main St", "<p>x</p>");
        assert_eq!(a.short_address(), "123 Main St");

        a.address = "é".repeat(60);
        let short = a.short_address();
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 53);
    }

    #[test]
    fn payment_reference_falls_back_to_api_response() {
        let mut a = Analysis::new(Uuid::new_v4(), "1 Elm", "");
        assert_eq!(a.payment_reference(), None);
        assert_eq!(a.payment_status(), "pending");

        a.api_response = json!({ "payment_intent_id": "pi_embedded" });
        assert_eq!(a.payment_reference().as_deref(), Some("pi_embedded"));

        a.payment_intent_id = Some("pi_column".into());
        assert_eq!(a.payment_reference().as_deref(), Some("pi_column"));
    }
}
