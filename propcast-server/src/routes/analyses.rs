// File: propcast-server/src/routes/analyses.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use propcast_core::models::NewAnalysis;
use propcast_core::Error;

use crate::auth::AuthUser;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContentUpdate {
    pub analysis_content: Option<String>,
}

/// Unknown or malformed ids are indistinguishable from someone else's.
pub(crate) fn analysis_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Analysis not found."))
}

/// Headshot and logo of `user_id`'s profile, if they have one.
pub(crate) async fn branding(
    state: &AppState,
    user_id: Uuid,
) -> Result<(Option<String>, Option<String>), ApiError> {
    match state.accounts.profile_of(user_id).await {
        Ok(profile) => Ok((profile.headshot_url, profile.logo_url)),
        Err(Error::NotFound(_)) => Ok((None, None)),
        Err(e) => Err(e.into()),
    }
}

pub async fn save(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(input): JsonBody<NewAnalysis>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let analysis = state.analyses.save(user.user_id, input).await?;
    let (headshot, logo) = branding(&state, user.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Property analysis saved successfully.",
            "analysis_id": analysis.analysis_id,
            "created_at": analysis.created_at,
            "headshot": headshot,
            "logo": logo,
        })),
    ))
}

pub async fn recent(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let recent = state.analyses.recent(user.user_id).await?;
    let (headshot, logo) = branding(&state, user.user_id).await?;

    let items: Vec<Value> = recent
        .analyses
        .iter()
        .map(|a| {
            json!({
                "id": a.analysis_id,
                "address": a.address,
                "short_address": a.short_address(),
                "package_name": a.package_name,
                "analysis_model": a.analysis_model,
                "created_at": a.created_at,
                "updated_at": a.updated_at,
                "headshot": headshot,
                "logo": logo,
            })
        })
        .collect();

    Ok(Json(json!({
        "analyses": items,
        "total_count": recent.total_count,
        "headshot": headshot,
        "logo": logo,
    })))
}

pub async fn get_one(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let a = state.analyses.get(user.user_id, analysis_id(&id)?).await?;
    let (headshot, logo) = branding(&state, user.user_id).await?;
    Ok(Json(json!({
        "id": a.analysis_id,
        "address": a.address,
        "package_name": a.package_name,
        "analysis_content": a.analysis_content,
        "analysis_model": a.analysis_model,
        "api_response": a.api_response,
        "agent_description": a.agent_description,
        "created_at": a.created_at,
        "updated_at": a.updated_at,
        "headshot": headshot,
        "logo": logo,
    })))
}

pub async fn delete_one(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.analyses.delete(user.user_id, analysis_id(&id)?).await?;
    Ok(Json(json!({ "message": "Analysis deleted successfully." })))
}

pub async fn update_one(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ContentUpdate>,
) -> Result<Json<Value>, ApiError> {
    let id = analysis_id(&id)?;
    let updated_at = state
        .analyses
        .update_content(user.user_id, id, update.analysis_content.as_deref())
        .await?;
    Ok(Json(json!({
        "message": "Analysis updated successfully.",
        "analysis_id": id,
        "updated_at": updated_at,
    })))
}
