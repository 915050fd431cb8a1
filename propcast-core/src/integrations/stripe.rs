// File: propcast-core/src/integrations/stripe.rs
//
// Payment intents over Stripe's form-encoded REST API, plus webhook
// signature verification. Only the request and verify contracts live here.

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tracing::{info, warn};

use crate::http::HttpClient;
use crate::Error;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a webhook signature timestamp, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Default)]
pub struct PaymentIntentRequest {
    /// Smallest currency unit (cents for USD).
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub object: Value,
}

impl WebhookEvent {
    fn metadata(&self, key: &str) -> String {
        self.data.object["metadata"][key]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Clone)]
pub struct StripeClient {
    http: Arc<dyn HttpClient>,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(http: Arc<dyn HttpClient>, secret_key: &str) -> Self {
        Self::with_api_base(http, secret_key, DEFAULT_STRIPE_API_BASE)
    }

    pub fn with_api_base(http: Arc<dyn HttpClient>, secret_key: &str, api_base: &str) -> Self {
        Self {
            http,
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_payment_intent(&self, req: &PaymentIntentRequest) -> Result<PaymentIntent, Error> {
        if self.secret_key.is_empty() {
            return Err(Error::Config("Stripe secret key not configured.".into()));
        }
        if req.amount <= 0 {
            return Err(Error::Validation("Amount must be a positive integer.".into()));
        }

        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), req.amount.to_string()),
            ("currency".into(), req.currency.clone()),
            ("payment_method_types[]".into(), "card".into()),
            ("description".into(), req.description.clone()),
        ];
        for (k, v) in &req.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }

        let url = format!("{}/payment_intents", self.api_base);
        let headers = [("Authorization", format!("Bearer {}", self.secret_key))];
        let resp = self.http.post_form(&url, &headers, &form).await?;
        let body = resp.json_or_details();

        if !resp.is_success() {
            let msg = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("status {}", resp.status));
            warn!("Stripe rejected payment intent: {}", msg);
            return Err(Error::Payment(format!("Stripe error: {msg}")));
        }

        let client_secret = body["client_secret"].as_str();
        let id = body["id"].as_str();
        match (client_secret, id) {
            (Some(secret), Some(id)) => {
                info!("Created payment intent {} for amount={} {}", id, req.amount, req.currency);
                Ok(PaymentIntent {
                    client_secret: secret.to_string(),
                    payment_intent_id: id.to_string(),
                })
            }
            _ => Err(Error::Payment("Stripe response missing client_secret or id".into())),
        }
    }
}

/// Verifies a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`)
/// against the raw request body and returns the parsed event.
pub fn verify_webhook(
    payload: &str,
    signature_header: &str,
    secret: &str,
) -> Result<WebhookEvent, Error> {
    verify_webhook_at(payload, signature_header, secret, Utc::now().timestamp())
}

pub fn verify_webhook_at(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<WebhookEvent, Error> {
    if secret.is_empty() {
        return Err(Error::Config("Stripe webhook secret not configured.".into()));
    }

    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => {
                if let Ok(bytes) = hex::decode(v) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| Error::Validation("Invalid signature".into()))?;
    if signatures.is_empty() {
        return Err(Error::Validation("Invalid signature".into()));
    }
    if (now - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(Error::Validation("Invalid signature".into()));
    }

    let signed = format!("{timestamp}.{payload}");
    let matched = signatures.iter().any(|candidate| {
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(signed.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(candidate).is_ok()
    });
    if !matched {
        return Err(Error::Validation("Invalid signature".into()));
    }

    serde_json::from_str(payload).map_err(|_| Error::Validation("Invalid payload".into()))
}

/// Logs the payment outcome carried by a verified event.
pub fn handle_webhook_event(event: &WebhookEvent) {
    match event.event_type.as_str() {
        "payment_intent.succeeded" => info!(
            "Payment succeeded for user {}: {} package for {}",
            event.metadata("user_id"),
            event.metadata("package_name"),
            event.metadata("address"),
        ),
        "payment_intent.payment_failed" => {
            warn!("Payment failed for user {}", event.metadata("user_id"))
        }
        other => info!("Unhandled Stripe event type: {}", other),
    }
}

/// Builds a header value for `payload`; used by tests and local tooling.
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> Result<String, Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Config(e.to_string()))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory::RecordingHttpClient;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &str = r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1","metadata":{"user_id":"u1"}}}}"#;

    #[test]
    fn accepts_correct_signature() {
        let now = 1_700_000_000;
        let header = sign_payload(PAYLOAD, SECRET, now).unwrap();
        let event = verify_webhook_at(PAYLOAD, &header, SECRET, now + 10).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.metadata("user_id"), "u1");
    }

    #[test]
    fn rejects_tampering_wrong_secret_and_stale_timestamps() {
        let now = 1_700_000_000;
        let header = sign_payload(PAYLOAD, SECRET, now).unwrap();

        let tampered = PAYLOAD.replace("pi_1", "pi_2");
        assert!(verify_webhook_at(&tampered, &header, SECRET, now).is_err());
        assert!(verify_webhook_at(PAYLOAD, &header, "whsec_other", now).is_err());
        assert!(verify_webhook_at(PAYLOAD, &header, SECRET, now + WEBHOOK_TOLERANCE_SECS + 1).is_err());
        assert!(verify_webhook_at(PAYLOAD, "t=abc", SECRET, now).is_err());
        assert!(verify_webhook_at(PAYLOAD, "", SECRET, now).is_err());
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let now = 1_700_000_000;
        let good = sign_payload(PAYLOAD, SECRET, now).unwrap();
        let good_sig = good.split_once(",v1=").map(|(_, s)| s.to_string()).unwrap();
        let header = format!("t={now},v1={},v1={good_sig}", "00".repeat(32));
        assert!(verify_webhook_at(PAYLOAD, &header, SECRET, now).is_ok());
    }

    #[tokio::test]
    async fn create_payment_intent_posts_form() -> Result<(), Error> {
        let http = Arc::new(RecordingHttpClient::responding(
            200,
            r#"{"id":"pi_123","client_secret":"pi_123_secret"}"#,
        ));
        let stripe = StripeClient::new(http.clone(), "sk_test");
        let intent = stripe
            .create_payment_intent(&PaymentIntentRequest {
                amount: 4999,
                currency: "usd".into(),
                description: "Pro Package - Property Analysis for 1 Elm".into(),
                metadata: vec![("package_id".into(), "pro".into())],
            })
            .await?;

        assert_eq!(intent.payment_intent_id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret");

        let calls = http.calls();
        assert_eq!(calls[0].url, "https://api.stripe.com/v1/payment_intents");
        assert_eq!(calls[0].form_value("amount").as_deref(), Some("4999"));
        assert_eq!(calls[0].form_value("metadata[package_id]").as_deref(), Some("pro"));
        assert_eq!(calls[0].form_value("payment_method_types[]").as_deref(), Some("card"));
        Ok(())
    }

    #[tokio::test]
    async fn stripe_error_becomes_payment_error() {
        let http = Arc::new(RecordingHttpClient::responding(
            402,
            r#"{"error":{"message":"Your card was declined."}}"#,
        ));
        let stripe = StripeClient::new(http, "sk_test");
        let err = stripe
            .create_payment_intent(&PaymentIntentRequest {
                amount: 100,
                currency: "usd".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Payment(ref m) if m.contains("declined")));
    }
}
