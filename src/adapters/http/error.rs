use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::commands;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authorized to access this route")]
    Unauthenticated,

    #[error("{0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Command(#[from] commands::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use commands::Error as E;

        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Command(err) => match err {
                E::NotFound { .. } => StatusCode::NOT_FOUND,
                E::Forbidden(_) => StatusCode::FORBIDDEN,
                E::Conflict(_) => StatusCode::CONFLICT,
                E::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                E::Validation(_)
                | E::Capacity
                | E::DuplicateRegistration
                | E::InsufficientPoints { .. }
                | E::NotRegistered
                | E::PastEvent
                | E::AlreadyCompleted
                | E::Canceled => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UnauthenticatedError",
            ApiError::MalformedRequest(_) => "ValidationError",
            ApiError::Command(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "error": {
                "kind": self.kind(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedRequest(rejection.body_text())
    }
}
