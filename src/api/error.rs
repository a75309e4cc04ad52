use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::db::StoreError;
use crate::services::{AuthError, MovementError, UserError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    AlreadyExists(String),

    ValidationError(String),

    Unauthorized(String),

    Forbidden(String),

    Conflict(String),

    InternalError(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::AlreadyExists(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::AlreadyExists(_) => ApiError::AlreadyExists(err.to_string()),
            StoreError::InvalidInput(msg) => ApiError::ValidationError(msg),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(_) | StoreError::Internal(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<MovementError> for ApiError {
    fn from(err: MovementError) -> Self {
        match err {
            MovementError::Rule(rule) => ApiError::ValidationError(rule.to_string()),
            MovementError::InvalidId(_) => ApiError::ValidationError(err.to_string()),
            MovementError::Store(store) => store.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Unauthorized => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            AuthError::Store(store) => store.into(),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(msg) => ApiError::ValidationError(msg),
            UserError::WrongPassword => ApiError::ValidationError(err.to_string()),
            UserError::Forbidden(msg) => ApiError::Forbidden(msg),
            UserError::Store(store) => store.into(),
            UserError::Delivery(_) | UserError::Internal(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
