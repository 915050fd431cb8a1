// File: propcast-server/src/routes/accounts.rs

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use propcast_core::services::Registration;

use crate::auth::AuthUser;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshForm {
    pub refresh: String,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<Registration>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let signed = state.accounts.register(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully.",
            "refresh": signed.tokens.refresh,
            "access": signed.tokens.access,
            "user": signed.account,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> Result<Json<Value>, ApiError> {
    let signed = state.accounts.login(&form.username, &form.password).await?;
    Ok(Json(json!({
        "refresh": signed.tokens.refresh,
        "access": signed.tokens.access,
        "user": signed.account,
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<RefreshForm>,
) -> Result<Json<Value>, ApiError> {
    let pair = state.accounts.refresh(form.refresh.trim())?;
    Ok(Json(json!({ "access": pair.access, "refresh": pair.refresh })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let account = state.accounts.account(&user).await?;
    Ok(Json(json!({ "user": account })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(patch): JsonBody<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let account = state.accounts.update_profile(&user, &patch).await?;
    Ok(Json(json!({
        "message": "Profile updated successfully.",
        "user": account,
    })))
}
