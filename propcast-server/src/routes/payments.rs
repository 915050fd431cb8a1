// File: propcast-server/src/routes/payments.rs

use axum::{Json, extract::State, http::HeaderMap};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use propcast_core::integrations::stripe::{handle_webhook_event, verify_webhook};
use propcast_core::integrations::{PaymentIntent, PaymentIntentRequest};

use crate::auth::AuthUser;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentIntentForm {
    /// Cents; clients send either a number or a numeric string.
    pub amount: Value,
    pub currency: Option<String>,
    pub package_id: Value,
    pub package_name: Option<String>,
    pub address: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

fn amount_of(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(form): JsonBody<PaymentIntentForm>,
) -> Result<Json<PaymentIntent>, ApiError> {
    let amount = amount_of(&form.amount).filter(|a| *a != 0);
    let package_id = text_of(&form.package_id);
    let package_name = form.package_name.clone().filter(|p| !p.trim().is_empty());
    let (Some(amount), Some(package_id), Some(package_name)) = (amount, package_id, package_name) else {
        return Err(ApiError::bad_request("Amount, package_id, and package_name are required."));
    };

    let address = form.address.clone().unwrap_or_default();
    let customer_email = form
        .customer_email
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| user.email.clone());

    let request = PaymentIntentRequest {
        amount,
        currency: form.currency.clone().filter(|c| !c.is_empty()).unwrap_or_else(|| "usd".into()),
        description: format!("{package_name} Package - Property Analysis for {address}"),
        metadata: vec![
            ("user_id".into(), user.user_id.to_string()),
            ("user_email".into(), user.email.clone()),
            ("package_id".into(), package_id),
            ("package_name".into(), package_name),
            ("address".into(), address),
            ("customer_name".into(), form.customer_name.clone().unwrap_or_default()),
            ("customer_email".into(), customer_email),
        ],
    };

    Ok(Json(state.stripe.create_payment_intent(&request).await?))
}

/// Verifies the signature over the raw body before trusting anything in it.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: String,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = verify_webhook(&payload, signature, &state.stripe_webhook_secret).map_err(|e| {
        warn!("Rejected Stripe webhook: {}", e);
        ApiError::from(e)
    })?;
    handle_webhook_event(&event);
    Ok(Json(json!({ "status": "success" })))
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let records = state.analyses.payment_history(user.user_id).await?;
    Ok(Json(json!({
        "total_count": records.len(),
        "payment_history": records,
    })))
}
