use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::error;

use propcast_core::Error;

/// Every handler failure, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Service(Error),
    /// A provider error relayed with the provider's status. The provider's
    /// JSON keys are merged over `error`.
    Relayed { message: &'static str, status: u16, body: Value },
    Status(StatusCode, String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::Status(StatusCode::BAD_REQUEST, msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::Status(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR, msg.into())
    }

    /// Maps an upstream failure to a relayed error under `message`; other
    /// errors pass through.
    pub fn relay(message: &'static str) -> impl Fn(Error) -> ApiError {
        move |err| match err {
            Error::Upstream { status, body } => ApiError::Relayed { message, status, body },
            other => ApiError::Service(other),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Service(err)
    }
}

fn service_status(err: &Error) -> (StatusCode, String) {
    match err {
        Error::Validation(m) | Error::Conflict(m) | Error::Payment(m) => (StatusCode::BAD_REQUEST, m.clone()),
        Error::Auth(m) | Error::Token(m) => (StatusCode::UNAUTHORIZED, m.clone()),
        Error::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
        Error::Config(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        Error::Upstream { status, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            "Upstream request failed.".to_string(),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(err) => {
                let (status, message) = service_status(&err);
                if status.is_server_error() {
                    error!("request failed: {:?}", err);
                }
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Relayed { message, status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let mut out = serde_json::Map::new();
                out.insert("error".into(), Value::String(message.to_string()));
                match body {
                    Value::Object(fields) => {
                        out.extend(fields);
                    }
                    other => {
                        out.insert("details".into(), other);
                    }
                }
                (status, Json(Value::Object(out))).into_response()
            }
            ApiError::Status(status, message) => {
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

/// `Json<T>` whose rejection is rendered like every other error.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    ApiError::Status(rejection.status(), rejection.body_text())
}
