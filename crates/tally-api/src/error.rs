use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tally_types::api::{ErrorBody, FieldError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (400), with per-field detail.
    #[error("Invalid input")]
    Validation(Vec<FieldError>),

    /// No valid bearer token (401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(&'static str),

    /// Authenticated identity without a profile row (400, not 401).
    #[error("User profile not found. Please contact support.")]
    ProfileMissing,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Storage failure. Logged with detail, surfaced generically (500).
    #[error("Internal server error")]
    Storage(#[from] anyhow::Error),

    /// Other server-side failure with a message safe to show (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ProfileMissing => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", &rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid("query", &rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid("path", &rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            Self::Validation(fields) => Some(fields.clone()),
            Self::Storage(e) => {
                error!("Storage error: {:#}", e);
                None
            }
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
