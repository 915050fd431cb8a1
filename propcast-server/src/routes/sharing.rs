// File: propcast-server/src/routes/sharing.rs

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use propcast_core::models::ShareStats;
use propcast_core::services::{ShareRequest, SharedView};

use crate::auth::{AuthUser, ClientInfo};
use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    pub address: String,
}

pub async fn share(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<ShareRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.shares.share_analysis(&user, &req).await?;
    Ok(Json(json!({
        "message": "Analysis shared successfully",
        "share_id": outcome.share.share_id,
        "times_shared": outcome.share.times_shared,
    })))
}

pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ShareStats>, ApiError> {
    Ok(Json(state.shares.get_stats_for_address(&user, &query.address).await?))
}

/// Public: resolves the link, counts the view and returns the analysis.
pub async fn shared_view(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    client: ClientInfo,
) -> Result<Json<SharedView>, ApiError> {
    let view = state
        .views
        .view_shared(
            &share_id,
            client.host.as_deref(),
            client.origin.as_deref(),
            client.user_agent.as_deref(),
        )
        .await?;
    Ok(Json(view))
}
