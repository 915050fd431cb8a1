// File: propcast-server/src/routes/proxy.rs
//
// Thin pass-throughs to the AI and note-taking providers, plus agent
// description generation.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use propcast_ai::AiError;
use propcast_ai::models::DEFAULT_MODEL;
use propcast_core::Error;

use crate::auth::AuthUser;
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

fn ai_error(err: AiError) -> ApiError {
    match err {
        AiError::Upstream { status, body } => ApiError::Relayed {
            message: "Failed to get a valid response from Perplexity API",
            status,
            body,
        },
        AiError::Config(msg) => ApiError::internal(msg),
        AiError::Transport(msg) => ApiError::internal(format!("Error occurred during the API call: {msg}")),
        AiError::InvalidResponse(_) => ApiError::internal("Perplexity API did not return JSON data"),
    }
}

pub async fn perplexity(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    if state.completions.config().api_key.is_empty() {
        return Err(ApiError::internal("API key not configured."));
    }
    let Some(fields) = body.as_object().filter(|o| !o.is_empty()) else {
        return Err(ApiError::bad_request("No data provided in the request."));
    };
    let Some(messages) = fields.get("messages").filter(|m| !m.is_null()) else {
        return Err(ApiError::bad_request("Field \"messages\" is required."));
    };
    let model = fields
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_MODEL);

    let response = state
        .completions
        .chat(Some(model), messages)
        .await
        .map_err(ai_error)?;
    Ok(Json(response))
}

pub async fn notion_format(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let page = state
        .notion
        .export(&body)
        .await
        .map_err(ApiError::relay("Failed to create Notion page"))?;
    Ok(Json(page))
}

pub async fn generate_agent_description(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let profile = match state.accounts.profile_of(user.user_id).await {
        Ok(p) => p,
        Err(Error::NotFound(_)) => {
            return Err(ApiError::not_found(
                "Agent profile not found. Please complete your profile first.",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    match state.agent_descriptions.generate(&user, &profile).await {
        Some(description) => Ok(Json(json!({
            "agent_description": description,
            "message": "Agent description generated successfully",
        }))),
        None => Err(ApiError::internal(
            "Failed to generate agent description. Please try again.",
        )),
    }
}
