use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts},
};

use propcast_core::models::User;
use propcast_core::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// The user behind a valid `Authorization: Bearer <access token>` header.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("Authentication credentials were not provided.".into()))?;

        let user = state.accounts.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}

/// Where a request came from: peer address, user agent and `Host`.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub origin: Option<String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // first hop when behind a proxy
        let forwarded = header_str(header::HeaderName::from_static("x-forwarded-for"))
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientInfo {
            origin: forwarded.or(peer),
            user_agent: header_str(header::USER_AGENT),
            host: header_str(header::HOST),
        })
    }
}
