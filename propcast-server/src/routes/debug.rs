// File: propcast-server/src/routes/debug.rs
//
// Maintenance routes, mounted only with `--enable-debug-routes`.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use propcast_core::integrations::templates::welcome_email;

use crate::auth::AuthUser;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressForm {
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestEmailForm {
    pub email: String,
    pub name: Option<String>,
}

pub async fn reset_share_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(form): JsonBody<AddressForm>,
) -> Result<Json<Value>, ApiError> {
    let address = form.address.trim();
    if address.is_empty() {
        return Err(ApiError::bad_request("Property address is required."));
    }
    let analysis = state
        .analyses
        .find_by_address(user.user_id, address)
        .await?
        .ok_or_else(|| ApiError::not_found("Property analysis not found."))?;

    let reset = state.views.reset(analysis.analysis_id).await?;
    Ok(Json(json!({
        "message": "Share stats reset successfully",
        "shares_reset": reset,
    })))
}

pub async fn list_shares(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let listing = state.shares.list_all().await?;
    let shares: Vec<Value> = listing
        .iter()
        .map(|l| {
            json!({
                "id": l.share.share_id,
                "address": l.address,
                "share_link": l.share.share_link,
                "recipient_email": l.share.recipient_email,
                "shared_by": l.share.shared_by_name,
                "times_shared": l.share.times_shared,
                "times_viewed": l.share.times_viewed,
                "created_at": l.share.first_shared_at,
            })
        })
        .collect();
    Ok(Json(json!({ "total_shares": shares.len(), "shares": shares })))
}

pub async fn test_email(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<TestEmailForm>,
) -> Result<Json<Value>, ApiError> {
    let to = form.email.trim();
    if to.is_empty() {
        return Err(ApiError::bad_request("Email is required."));
    }
    let name = form.name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or("Test User");
    let mail = welcome_email(name);

    if state.mailer.send(to, &mail.subject, &mail.html).await {
        Ok(Json(json!({ "message": "Test email sent successfully!", "to": to })))
    } else {
        warn!("Test email to {} failed", to);
        Err(ApiError::internal("Failed to send test email"))
    }
}
